//! # ワークフローグラフ
//!
//! 定義・状態・遷移をまとめて読み込んだ結果。遷移表を唯一の正とし、
//! アクションの解決（どの辺を通るか）はすべてこの型で行う。

use std::collections::HashSet;

use super::{
    definition::WorkflowDefinition,
    state::WorkflowState,
    transition::WorkflowTransition,
};
use crate::{
    DomainError,
    action::ActionError,
    value_objects::{ActionName, StateName},
};

/// ワークフロー定義と状態グラフ
///
/// # 不変条件
///
/// - 状態・遷移はすべて同じ定義に属する
/// - 状態名は定義内で一意
/// - 遷移の両端は定義内の状態
/// - `(遷移元状態, アクション名)` は一意
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    definition:  WorkflowDefinition,
    states:      Vec<WorkflowState>,
    transitions: Vec<WorkflowTransition>,
}

impl WorkflowGraph {
    /// # Errors
    ///
    /// - `DomainError::Validation`: 上記の不変条件違反
    pub fn new(
        definition: WorkflowDefinition,
        mut states: Vec<WorkflowState>,
        transitions: Vec<WorkflowTransition>,
    ) -> Result<Self, DomainError> {
        let definition_id = definition.id();

        let mut names = HashSet::new();
        for state in &states {
            if state.workflow_id() != definition_id {
                return Err(DomainError::Validation(format!(
                    "状態 {} は別のワークフローに属しています",
                    state.name()
                )));
            }
            if !names.insert(state.name()) {
                return Err(DomainError::Validation(format!(
                    "状態名が重複しています: {}",
                    state.name()
                )));
            }
        }

        let mut edges = HashSet::new();
        for transition in &transitions {
            if transition.workflow_id() != definition_id {
                return Err(DomainError::Validation(format!(
                    "遷移 {} は別のワークフローに属しています",
                    transition.action()
                )));
            }
            for endpoint in [transition.from_state(), transition.to_state()] {
                if !names.contains(endpoint) {
                    return Err(DomainError::Validation(format!(
                        "遷移 {} の状態 {} が定義されていません",
                        transition.action(),
                        endpoint
                    )));
                }
            }
            if !edges.insert((transition.from_state(), transition.action())) {
                return Err(DomainError::Validation(format!(
                    "状態 {} のアクション {} が重複しています",
                    transition.from_state(),
                    transition.action()
                )));
            }
        }

        states.sort_by_key(WorkflowState::order);
        Ok(Self {
            definition,
            states,
            transitions,
        })
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// 並び順でソート済みの状態一覧
    pub fn states(&self) -> &[WorkflowState] {
        &self.states
    }

    pub fn transitions(&self) -> &[WorkflowTransition] {
        &self.transitions
    }

    pub fn state(&self, name: &StateName) -> Option<&WorkflowState> {
        self.states.iter().find(|s| s.name() == name)
    }

    /// 定義の初期状態（未設定の場合は `None`）
    pub fn initial_state(&self) -> Option<&WorkflowState> {
        self.state(self.definition.initial_state())
    }

    /// 現在状態から提示できる遷移を遷移先の並び順で返す
    pub fn offered_transitions(
        &self,
        from: &StateName,
        approval_needed: bool,
    ) -> Vec<&WorkflowTransition> {
        let mut offered: Vec<_> = self
            .transitions
            .iter()
            .filter(|t| t.from_state() == from)
            .filter(|t| t.approval_effect().is_offered(approval_needed))
            .collect();
        offered.sort_by_key(|t| self.state(t.to_state()).map(WorkflowState::order));
        offered
    }

    /// アクション名から通過する遷移を解決する
    ///
    /// # Errors
    ///
    /// - `ActionError::UnknownAction`: ワークフローのどこにも存在しないアクション
    /// - `ActionError::InvalidTransition`: 現在状態からの辺がない、または承認要否により提示されない
    pub fn resolve_action(
        &self,
        current: &StateName,
        action: &ActionName,
        approval_needed: bool,
    ) -> Result<&WorkflowTransition, ActionError> {
        if !self.transitions.iter().any(|t| t.action() == action) {
            return Err(ActionError::UnknownAction(action.to_string()));
        }

        self.transitions
            .iter()
            .find(|t| t.from_state() == current && t.action() == action)
            .filter(|t| t.approval_effect().is_offered(approval_needed))
            .ok_or_else(|| ActionError::InvalidTransition {
                action:  action.to_string(),
                current: current.to_string(),
            })
    }
}

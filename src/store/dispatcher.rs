use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::actions::Action;
use super::reducer::apply;
use super::state::TreeState;
use crate::error::DispatchError;

/// Owner of the current questionnaire state.
///
/// Dispatches are serialized behind the write lock; readers clone the
/// current `Arc` and keep a consistent snapshot for as long as they need it.
#[derive(Debug)]
pub struct TreeStore {
    current: Arc<RwLock<Arc<TreeState>>>,
}

impl TreeStore {
    pub fn new(state: TreeState) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    pub async fn snapshot(&self) -> Arc<TreeState> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn dispatch(&self, action: Action) -> Result<Arc<TreeState>, DispatchError> {
        let kind = action.kind();
        let mut current = self.current.write().await;

        match apply(&current, action) {
            Ok(next) => {
                let next = Arc::new(next);
                *current = Arc::clone(&next);
                tracing::debug!(action = kind, items = next.items.len(), "dispatched action");
                Ok(next)
            }
            Err(e) => {
                tracing::debug!(action = kind, error = %e, "rejected action");
                Err(e)
            }
        }
    }

    /// Decode and dispatch an action given as untyped JSON.
    pub async fn dispatch_json(&self, action: Value) -> Result<Arc<TreeState>, DispatchError> {
        self.dispatch(Action::from_json(action)?).await
    }

    /// Dispatch only if no other action has landed since `expected` was read.
    /// Returns `Ok(None)` when the state has moved on.
    pub async fn dispatch_if_current(
        &self,
        expected: &Arc<TreeState>,
        action: Action,
    ) -> Result<Option<Arc<TreeState>>, DispatchError> {
        let mut current = self.current.write().await;
        if !Arc::ptr_eq(&current, expected) {
            return Ok(None);
        }
        let next = Arc::new(apply(&current, action)?);
        *current = Arc::clone(&next);
        Ok(Some(next))
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new(TreeState::default())
    }
}

impl Clone for TreeStore {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

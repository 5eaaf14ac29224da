//! Pipeline chains.
//!
//! Every registered handler owns one [`Stage`]. Stages are linked into linear
//! chains through `prev`/`next` ids, so a chain is a doubly-linked list stored
//! in an arena keyed by [`HandlerId`]. A stage has at most one predecessor and
//! at most one successor; branching is not representable.
//!
//! Linking is split in two steps. [`ChainIndex::plan`] validates a request
//! without touching the index, and [`ChainIndex::apply`] performs it. A
//! rejected registration therefore never leaves partial links behind.

use std::collections::HashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::framework::handler::{Handler, HandlerId};

/// One handler's position in a chain.
#[derive(Debug, Clone)]
pub struct Stage {
    pub handler: Handler,
    pub prev: Option<HandlerId>,
    pub next: Option<HandlerId>,
}

impl Stage {
    fn root(handler: Handler) -> Self {
        Self {
            handler,
            prev: None,
            next: None,
        }
    }
}

/// A validated chain mutation.
#[derive(Debug, Clone)]
pub enum Link {
    /// Start a new chain with this handler.
    Root(Handler),
    /// Append the handler after `parent`, creating its stage if needed.
    Append {
        handler: Handler,
        parent: HandlerId,
        existing: bool,
    },
}

/// Arena of stages.
#[derive(Debug, Default)]
pub struct ChainIndex {
    stages: HashMap<HandlerId, Stage>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, id: HandlerId) -> Option<&Stage> {
        self.stages.get(&id)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Validates registering `handler` with an optional `parent`.
    pub fn plan(&self, handler: &Handler, parent: Option<&Handler>) -> RegistryResult<Link> {
        let id = handler.id();

        let Some(parent) = parent else {
            if self.stages.contains_key(&id) {
                return Err(RegistryError::DuplicateRoot { handler: id });
            }
            return Ok(Link::Root(handler.clone()));
        };

        let parent_id = parent.id();
        if parent_id == id {
            return Err(RegistryError::SelfLink { handler: id });
        }

        let existing = match self.stages.get(&id) {
            Some(stage) if stage.next.is_some() => {
                return Err(RegistryError::HandlerHasChild { handler: id });
            }
            Some(stage) if stage.prev.is_some() => {
                return Err(RegistryError::HandlerHasParent { handler: id });
            }
            Some(_) => true,
            None => false,
        };

        match self.stages.get(&parent_id) {
            None => Err(RegistryError::ParentNotRegistered {
                handler: id,
                parent: parent_id,
            }),
            Some(stage) if stage.next.is_some() => Err(RegistryError::ParentHasChild {
                handler: id,
                parent: parent_id,
            }),
            Some(_) => Ok(Link::Append {
                handler: handler.clone(),
                parent: parent_id,
                existing,
            }),
        }
    }

    /// Applies a link produced by [`plan`](Self::plan) on the same index.
    pub fn apply(&mut self, link: Link) -> HandlerId {
        match link {
            Link::Root(handler) => {
                let id = handler.id();
                self.stages.insert(id, Stage::root(handler));
                id
            }
            Link::Append {
                handler,
                parent,
                existing,
            } => {
                let id = handler.id();
                if !existing {
                    self.stages.insert(id, Stage::root(handler));
                }
                if let Some(stage) = self.stages.get_mut(&id) {
                    stage.prev = Some(parent);
                }
                if let Some(stage) = self.stages.get_mut(&parent) {
                    stage.next = Some(id);
                }
                id
            }
        }
    }

    /// Iterates the stages from `start` to the end of its chain.
    pub fn walk(&self, start: HandlerId) -> Walk<'_> {
        Walk {
            index: self,
            cursor: Some(start),
        }
    }

    /// Number of stages from `start` to the end of its chain.
    pub fn len_from(&self, start: HandlerId) -> usize {
        self.walk(start).count()
    }

    /// First stage of the chain containing `id`.
    pub fn root_of(&self, id: HandlerId) -> Option<HandlerId> {
        let mut current = self.stages.get(&id)?;
        let mut current_id = id;
        while let Some(prev) = current.prev {
            current = self.stages.get(&prev)?;
            current_id = prev;
        }
        Some(current_id)
    }
}

/// Iterator over a chain, following `next` links.
pub struct Walk<'a> {
    index: &'a ChainIndex,
    cursor: Option<HandlerId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Stage;

    fn next(&mut self) -> Option<Self::Item> {
        let stage = self.index.stages.get(&self.cursor?)?;
        self.cursor = stage.next;
        Some(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::foundation::context::CallContext;
    use crate::foundation::payload::CallData;

    async fn step(_ctx: CallContext, data: CallData) -> HandlerResult {
        Ok(data)
    }

    fn link(
        index: &mut ChainIndex,
        handler: &Handler,
        parent: Option<&Handler>,
    ) -> RegistryResult<HandlerId> {
        let planned = index.plan(handler, parent)?;
        Ok(index.apply(planned))
    }

    fn ids(index: &ChainIndex, start: &Handler) -> Vec<HandlerId> {
        index.walk(start.id()).map(|s| s.handler.id()).collect()
    }

    #[test]
    fn test_linear_chain() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        link(&mut index, &b, Some(&a)).unwrap();
        link(&mut index, &c, Some(&b)).unwrap();

        assert_eq!(ids(&index, &a), vec![a.id(), b.id(), c.id()]);
        assert_eq!(ids(&index, &b), vec![b.id(), c.id()]);
        assert_eq!(index.len_from(c.id()), 1);
        assert_eq!(index.root_of(c.id()), Some(a.id()));
        assert_eq!(index.get(b.id()).unwrap().prev, Some(a.id()));
    }

    #[test]
    fn test_existing_root_can_become_child() {
        let (a, b) = (Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        link(&mut index, &b, None).unwrap();
        link(&mut index, &b, Some(&a)).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(ids(&index, &a), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_duplicate_root_rejected() {
        let a = Handler::new(step);
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        let err = link(&mut index, &a, None).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRoot { handler: a.id() });
    }

    #[test]
    fn test_unknown_parent_rejected_without_mutation() {
        let (a, b) = (Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        let err = link(&mut index, &b, Some(&a)).unwrap_err();
        assert!(matches!(err, RegistryError::ParentNotRegistered { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_branching_rejected() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        link(&mut index, &b, Some(&a)).unwrap();

        let err = link(&mut index, &c, Some(&a)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::ParentHasChild {
                handler: c.id(),
                parent: a.id()
            }
        );
        assert!(!index.contains(c.id()));
        assert_eq!(ids(&index, &a), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_second_parent_rejected() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        link(&mut index, &c, None).unwrap();
        link(&mut index, &b, Some(&a)).unwrap();

        let err = link(&mut index, &b, Some(&c)).unwrap_err();
        assert_eq!(err, RegistryError::HandlerHasParent { handler: b.id() });
        assert_eq!(index.get(c.id()).unwrap().next, None);
        assert_eq!(index.get(b.id()).unwrap().prev, Some(a.id()));
    }

    #[test]
    fn test_handler_with_child_rejected() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        link(&mut index, &b, Some(&a)).unwrap();
        link(&mut index, &c, None).unwrap();

        let err = link(&mut index, &a, Some(&c)).unwrap_err();
        assert_eq!(err, RegistryError::HandlerHasChild { handler: a.id() });
        assert_eq!(index.get(c.id()).unwrap().next, None);
    }

    #[test]
    fn test_self_link_rejected() {
        let a = Handler::new(step);
        let mut index = ChainIndex::new();
        link(&mut index, &a, None).unwrap();
        let err = link(&mut index, &a, Some(&a)).unwrap_err();
        assert_eq!(err, RegistryError::SelfLink { handler: a.id() });
    }
}

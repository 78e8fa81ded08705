use uuid::Uuid;

use crate::core::{MapperError, Result};

/// Entities on the path from the root of a read to the one being loaded.
///
/// Revisiting an entity already on the path is a cycle; the same entity
/// reached through two separate branches is not. The root sits at level 0,
/// so `max_depth` bounds the number of relation hops below it.
#[derive(Debug, Clone)]
pub struct ReadTrail {
    path: Vec<(String, Uuid)>,
    max_depth: usize,
}

impl ReadTrail {
    pub fn new(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            max_depth,
        }
    }

    pub(crate) fn enter(&mut self, table: &str, id: Uuid) -> Result<()> {
        if self.path.iter().any(|(seen, seen_id)| seen == table && *seen_id == id) {
            return Err(MapperError::RelationCycle {
                table: table.to_string(),
                id,
            });
        }
        if self.path.len() > self.max_depth {
            return Err(MapperError::RelationDepthExceeded {
                depth: self.max_depth,
            });
        }
        self.path.push((table.to_string(), id));
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.path.pop();
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

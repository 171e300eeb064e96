use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("root has no parent-relative side")]
    RootHasNoSide,
    #[error("the tree is empty")]
    Empty,
    #[error("key not found in the tree")]
    KeyNotFound,
}

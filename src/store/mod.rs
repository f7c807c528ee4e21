// Flat-file assistant store

pub mod assistants;

pub use assistants::{
    Assistant, AssistantStatus, AssistantStore, StoreError, KNOWLEDGE_BASE_LIMIT,
};

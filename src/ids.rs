use uuid::Uuid;

/// Generates an opaque identifier for a new entity.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

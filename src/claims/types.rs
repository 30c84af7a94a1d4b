use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimCommand {
    pub request_id: Uuid,
    pub owner: String,
    pub consumption_registry: String,
    pub consumption_certificate_id: Uuid,
    pub production_registry: String,
    pub production_certificate_id: Uuid,
    pub quantity: u64,
}

/// The claim saga is queued; its result shows up in wallet state later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAccepted {
    pub request_id: Uuid,
    pub saga_id: Uuid,
    pub allocation_ids: Vec<Uuid>,
}

use serde::Deserialize;

/// Body for the approval decision endpoint.
#[derive(Debug, Deserialize)]
pub struct ApprovalDecisionRequest {
    pub decision: Option<String>,
    pub reason: Option<String>,
}

/// Filter for the residents listing.
#[derive(Debug, Deserialize)]
pub struct ResidentsQuery {
    pub hostel: Option<String>,
}

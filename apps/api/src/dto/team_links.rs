use rolegraph_domain::TeamLink;
use serde::Serialize;
use ts_rs::TS;

/// API representation of a derived leader-member link.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "team-link-response.ts")]
pub struct TeamLinkResponse {
    pub leader_subject: String,
    pub member_subject: String,
    pub resource: String,
}

/// Outcome of a full tenant recompute.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "team-link-rebuild-response.ts")]
pub struct TeamLinkRebuildResponse {
    pub link_count: u32,
}

impl From<TeamLink> for TeamLinkResponse {
    fn from(value: TeamLink) -> Self {
        Self {
            leader_subject: value.leader_subject,
            member_subject: value.member_subject,
            resource: value.resource,
        }
    }
}

//! Entity and payload types exchanged with the platform.
//!
//! These are deliberately thin: a handful of typed fields the client layer
//! itself needs (ids, titles, paths), with everything else carried through
//! untouched in flattened `extra` maps. The platform's field schemas are not
//! this crate's business.

pub mod boards;
pub mod iterations;
pub mod pull_requests;
pub mod repositories;
pub mod teams;
pub mod wiki;
pub mod work_items;

pub use boards::{Board, BoardColumn, BoardSettings, BoardsList};
pub use iterations::{CreateIterationPayload, IterationCapacity, IterationWorkItems, TeamIteration};
pub use pull_requests::{
    CreatePullRequestPayload, PullRequest, PullRequestList, UpdatePullRequestPayload,
};
pub use repositories::{GitRepository, RepositoryList};
pub use teams::{Team, TeamMember, TeamMembers, TeamsList};
pub use wiki::{CreateWikiPayload, Wiki, WikiList, WikiPage, WikiPagePayload};
pub use work_items::{
    AddRelationPayload, CreateWorkItemPayload, PatchOperation, UpdateWorkItemPayload, WiqlQuery,
    WiqlResult, WiqlWorkItemReference, WorkItem, WorkItemRelation,
};

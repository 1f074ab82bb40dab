//! Conversational core of the analyst front-end.
//!
//! Forwards each question to the hosted analyst service, executes the SQL it
//! returns, and turns the multi-part answer into a render view-model. One
//! [`TurnLoop`] owns the state of one chat session; the [`SessionRegistry`]
//! keeps the loops of all live sessions.

pub mod client;
pub mod error;
pub mod registry;
pub mod render;
pub mod session;
pub mod turn_loop;

pub use client::{Assistant, AssistantResponse, CortexAnalystClient, RetryPolicy};
pub use error::{AssistantError, ChatError};
pub use registry::{ActiveTurn, SessionHandle, SessionRegistry, SessionSummary};
pub use render::{
    ChartSpec, RenderOutcome, RenderedBlock, ResultView, SuggestionChip, TurnRenderer, ViewKind,
};
pub use session::{ChatSession, RecentMessage, Sidebar, SidebarEntry};
pub use turn_loop::{RenderedTurn, TurnLoop, TurnOutcome};

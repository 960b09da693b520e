//! The backend collaborator seen from the board.

use crate::desk::{CommentView, DeskStore, TicketView};
use crate::error::Result;
use crate::identity::SessionToken;
use crate::lifecycle::TicketPatch;
use crate::query::{Page, TicketQuery};
use crate::types::{CommentId, TicketDraft, TicketId};
use async_trait::async_trait;

/// Ticket and comment operations the board calls from its effects.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Paged listing
    async fn list_tickets(&self, token: &SessionToken, query: &TicketQuery)
        -> Result<Page<TicketView>>;

    /// One ticket
    async fn ticket(&self, token: &SessionToken, id: TicketId) -> Result<TicketView>;

    /// Comments on a ticket, newest first
    async fn comments(&self, token: &SessionToken, ticket_id: TicketId)
        -> Result<Vec<CommentView>>;

    /// Open a ticket
    async fn create_ticket(&self, token: &SessionToken, draft: TicketDraft) -> Result<TicketView>;

    /// Partially update a ticket
    async fn update_ticket(
        &self,
        token: &SessionToken,
        id: TicketId,
        patch: TicketPatch,
    ) -> Result<TicketView>;

    /// Delete a ticket
    async fn delete_ticket(&self, token: &SessionToken, id: TicketId) -> Result<()>;

    /// Post a comment
    async fn add_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        content: String,
    ) -> Result<CommentView>;

    /// Remove a comment
    async fn delete_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        comment_id: CommentId,
    ) -> Result<()>;
}

#[async_trait]
impl Backend for DeskStore {
    async fn list_tickets(
        &self,
        token: &SessionToken,
        query: &TicketQuery,
    ) -> Result<Page<TicketView>> {
        Self::list_tickets(self, token, query).await
    }

    async fn ticket(&self, token: &SessionToken, id: TicketId) -> Result<TicketView> {
        Self::ticket(self, token, id).await
    }

    async fn comments(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
    ) -> Result<Vec<CommentView>> {
        Self::comments(self, token, ticket_id).await
    }

    async fn create_ticket(&self, token: &SessionToken, draft: TicketDraft) -> Result<TicketView> {
        Self::create_ticket(self, token, draft).await
    }

    async fn update_ticket(
        &self,
        token: &SessionToken,
        id: TicketId,
        patch: TicketPatch,
    ) -> Result<TicketView> {
        Self::update_ticket(self, token, id, patch).await
    }

    async fn delete_ticket(&self, token: &SessionToken, id: TicketId) -> Result<()> {
        Self::delete_ticket(self, token, id).await
    }

    async fn add_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        content: String,
    ) -> Result<CommentView> {
        Self::add_comment(self, token, ticket_id, content).await
    }

    async fn delete_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        comment_id: CommentId,
    ) -> Result<()> {
        Self::delete_comment(self, token, ticket_id, comment_id).await
    }
}

//! Type-ahead suggestions. A later keystroke supersedes earlier fetches.

use crate::fetch::AssetFetchClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct SuggestionTracker {
    input: String,
    generation: u64,
    suggestions: Vec<String>,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Blank input clears the list and needs no fetch.
    pub fn input_changed(&mut self, text: &str) -> Option<SuggestionTicket> {
        self.input = text.to_string();
        self.generation += 1;
        let query = text.trim();
        if query.is_empty() {
            self.suggestions.clear();
            return None;
        }
        Some(SuggestionTicket {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// Returns false when the ticket no longer matches the current input.
    pub fn apply(&mut self, ticket: &SuggestionTicket, results: Vec<String>) -> bool {
        if ticket.generation != self.generation || ticket.query != self.input.trim() {
            tracing::trace!(query = %ticket.query, "dropping stale suggestions");
            return false;
        }
        self.suggestions = results;
        true
    }

    /// Fetch errors show as an empty list.
    pub async fn fetch_and_apply<C>(&mut self, client: &C, ticket: SuggestionTicket) -> bool
    where
        C: AssetFetchClient + ?Sized,
    {
        let results = match client.suggestions(&ticket.query).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(query = %ticket.query, "suggestion fetch failed: {}", err);
                Vec::new()
            }
        };
        self.apply(&ticket, results)
    }
}

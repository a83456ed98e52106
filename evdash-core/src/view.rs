//! Which screen the dashboard shows, and which event it is about.
//!
//! States hold event ids, not record copies; the controller resolves them
//! against its current set so a refreshed record is always shown up to date.
//!
//! ```text
//! List --Select(e)--> Details(e) --Back--> List
//! Details(e) --RequestEdit--> ConfirmEdit(e) --Confirm--> Edit(Some(e))
//!                                            --Cancel---> Details(e)
//! Details(e) --RequestDelete--> ConfirmDelete(e) --Deleted--> List
//!                                                --Cancel---> Details(e)
//! List --CreateNew--> Edit(None)
//! Edit(_) --Saved(r)--> Details(r)
//! Edit(Some(e)) --Cancel--> Details(e)     Edit(None) --Cancel--> List
//! ```

use std::fmt;

use crate::error::{DashError, DashResult};
use crate::event::EventId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    List,
    Details(EventId),
    /// `None` when creating a new event.
    Edit(Option<EventId>),
    ConfirmDelete(EventId),
    ConfirmEdit(EventId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewIntent {
    Select(EventId),
    Back,
    RequestEdit,
    RequestDelete,
    /// Accept the open confirmation dialog. From `ConfirmDelete` the store
    /// delete has to succeed first; the controller then applies `Deleted`.
    Confirm,
    Cancel,
    CreateNew,
    /// The store accepted a create or update.
    Saved(EventId),
    /// The store accepted a delete.
    Deleted,
}

impl ViewState {
    /// The state after `intent`, or `InvalidTransition` if the intent does not
    /// apply here. Never mutates; the caller decides when to commit.
    pub fn transition(&self, intent: &ViewIntent) -> DashResult<ViewState> {
        use ViewIntent as I;
        use ViewState as S;

        let next = match (self, intent) {
            (S::List, I::Select(id)) => S::Details(id.clone()),
            (S::List, I::CreateNew) => S::Edit(None),

            (S::Details(_), I::Back) => S::List,
            (S::Details(id), I::RequestEdit) => S::ConfirmEdit(id.clone()),
            (S::Details(id), I::RequestDelete) => S::ConfirmDelete(id.clone()),

            (S::ConfirmEdit(id), I::Confirm) => S::Edit(Some(id.clone())),
            (S::ConfirmEdit(id), I::Cancel) => S::Details(id.clone()),

            (S::ConfirmDelete(_), I::Deleted) => S::List,
            (S::ConfirmDelete(id), I::Cancel) => S::Details(id.clone()),

            (S::Edit(_), I::Saved(id)) => S::Details(id.clone()),
            (S::Edit(Some(id)), I::Cancel) => S::Details(id.clone()),
            (S::Edit(None), I::Cancel) => S::List,

            _ => {
                return Err(DashError::InvalidTransition {
                    from: self.name(),
                    intent: intent.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// The event this state is about, if any.
    pub fn subject(&self) -> Option<&EventId> {
        match self {
            ViewState::List | ViewState::Edit(None) => None,
            ViewState::Details(id)
            | ViewState::Edit(Some(id))
            | ViewState::ConfirmDelete(id)
            | ViewState::ConfirmEdit(id) => Some(id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::List => "list",
            ViewState::Details(_) => "details",
            ViewState::Edit(None) => "create",
            ViewState::Edit(Some(_)) => "edit",
            ViewState::ConfirmDelete(_) => "confirm-delete",
            ViewState::ConfirmEdit(_) => "confirm-edit",
        }
    }
}

impl fmt::Display for ViewIntent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ViewIntent::Select(id) => write!(f, "select event {id}"),
            ViewIntent::Back => f.write_str("go back"),
            ViewIntent::RequestEdit => f.write_str("edit"),
            ViewIntent::RequestDelete => f.write_str("delete"),
            ViewIntent::Confirm => f.write_str("confirm"),
            ViewIntent::Cancel => f.write_str("cancel"),
            ViewIntent::CreateNew => f.write_str("create an event"),
            ViewIntent::Saved(_) => f.write_str("save"),
            ViewIntent::Deleted => f.write_str("finish deleting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EventId {
        EventId::from(s)
    }

    fn step(state: ViewState, intents: &[ViewIntent]) -> ViewState {
        intents
            .iter()
            .fold(state, |s, i| s.transition(i).expect("valid transition"))
    }

    #[test]
    fn test_select_then_back() {
        let details = ViewState::List.transition(&ViewIntent::Select(id("7"))).unwrap();
        assert_eq!(details, ViewState::Details(id("7")));
        assert_eq!(details.transition(&ViewIntent::Back).unwrap(), ViewState::List);
    }

    #[test]
    fn test_edit_requires_confirmation() {
        let state = step(
            ViewState::Details(id("7")),
            &[ViewIntent::RequestEdit, ViewIntent::Confirm],
        );
        assert_eq!(state, ViewState::Edit(Some(id("7"))));

        let cancelled = step(
            ViewState::Details(id("7")),
            &[ViewIntent::RequestEdit, ViewIntent::Cancel],
        );
        assert_eq!(cancelled, ViewState::Details(id("7")));
    }

    #[test]
    fn test_delete_flow() {
        let confirm = ViewState::Details(id("7"))
            .transition(&ViewIntent::RequestDelete)
            .unwrap();
        assert_eq!(confirm, ViewState::ConfirmDelete(id("7")));
        assert_eq!(confirm.transition(&ViewIntent::Deleted).unwrap(), ViewState::List);
        assert_eq!(
            confirm.transition(&ViewIntent::Cancel).unwrap(),
            ViewState::Details(id("7"))
        );
    }

    #[test]
    fn test_confirm_alone_does_not_leave_delete_dialog() {
        let confirm = ViewState::ConfirmDelete(id("7"));
        assert!(matches!(
            confirm.transition(&ViewIntent::Confirm),
            Err(DashError::InvalidTransition { from: "confirm-delete", .. })
        ));
    }

    #[test]
    fn test_create_new_and_cancel() {
        let edit = ViewState::List.transition(&ViewIntent::CreateNew).unwrap();
        assert_eq!(edit, ViewState::Edit(None));
        assert_eq!(edit.subject(), None);
        assert_eq!(edit.transition(&ViewIntent::Cancel).unwrap(), ViewState::List);
    }

    #[test]
    fn test_save_lands_on_details_of_result() {
        let state = ViewState::Edit(None).transition(&ViewIntent::Saved(id("99"))).unwrap();
        assert_eq!(state, ViewState::Details(id("99")));

        let state = ViewState::Edit(Some(id("5")))
            .transition(&ViewIntent::Cancel)
            .unwrap();
        assert_eq!(state, ViewState::Details(id("5")));
    }

    #[test]
    fn test_invalid_intents_are_rejected() {
        assert!(ViewState::List.transition(&ViewIntent::Back).is_err());
        assert!(ViewState::List.transition(&ViewIntent::RequestDelete).is_err());
        assert!(
            ViewState::Details(id("1"))
                .transition(&ViewIntent::Select(id("2")))
                .is_err()
        );
        assert!(ViewState::Edit(None).transition(&ViewIntent::Back).is_err());
    }
}

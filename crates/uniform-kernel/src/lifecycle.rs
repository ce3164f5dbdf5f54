//! Request lifecycle engine.
//!
//! Maps `(status, modification policy, existing data, editing)` to the
//! [ViewMode] an owner sees, and applies [LifecycleEvent]s as a pure
//! transition function over [OwnerState]. The decision table, in priority
//! order:
//!
//! 1. policy enabled and status `ModificationRequested` → [ViewMode::WaitingApproval]
//! 2. existing data, status neither unset nor `Modifiable`, not editing →
//!    [ViewMode::ReadOnly]
//! 3. otherwise → [ViewMode::EditForm], prefilled with the existing sizes
//!
//! A successful submit moves to the terminal [ViewMode::SubmittedConfirmation].

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::error::PortalError;
use crate::policy::{ModificationPolicy, PolicyMessage};
use crate::record::{SizeRequest, StudentRecord};
use crate::size::UniformSizes;
use crate::status::RequestStatus;

/// How an owner leaves [ViewMode::ReadOnly].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditAction {
    /// Ask staff for edit access (policy enabled).
    RequestEdit,
    /// Open the form locally (policy disabled).
    BeginEdit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ViewMode {
    #[strum(to_string = "EDIT_FORM")]
    EditForm { prefill: UniformSizes },
    #[strum(to_string = "READ_ONLY")]
    ReadOnly { edit: EditAction },
    #[strum(to_string = "WAITING_APPROVAL")]
    WaitingApproval,
    #[strum(to_string = "SUBMITTED_CONFIRMATION")]
    SubmittedConfirmation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum OwnerAction {
    Refresh,
    Cancel,
    RequestEdit,
    BeginEdit,
    Submit,
    ResetToSearch,
}

impl OwnerAction {
    /// Actions that write to the record store.
    pub fn mutates_store(self) -> bool {
        matches!(self, OwnerAction::RequestEdit | OwnerAction::Submit)
    }
}

impl ViewMode {
    pub fn legal_actions(&self) -> &'static [OwnerAction] {
        match self {
            ViewMode::EditForm { .. } => &[OwnerAction::Submit, OwnerAction::Cancel],
            ViewMode::ReadOnly {
                edit: EditAction::RequestEdit,
            } => &[OwnerAction::RequestEdit, OwnerAction::Cancel],
            ViewMode::ReadOnly {
                edit: EditAction::BeginEdit,
            } => &[OwnerAction::BeginEdit, OwnerAction::Cancel],
            ViewMode::WaitingApproval => &[OwnerAction::Refresh, OwnerAction::Cancel],
            ViewMode::SubmittedConfirmation => &[OwnerAction::ResetToSearch],
        }
    }

    pub fn allows(&self, action: OwnerAction) -> bool {
        self.legal_actions().contains(&action)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ViewMode::SubmittedConfirmation)
    }
}

/// Inputs of the decision table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifecycleInput {
    pub status: RequestStatus,
    pub policy_modification_enabled: bool,
    pub has_existing_data: bool,
    /// Owner already opened the form locally via `beginEdit`.
    pub editing: bool,
    /// Sizes used to prefill the edit form.
    pub existing: UniformSizes,
}

impl LifecycleInput {
    pub fn new(
        status: RequestStatus,
        policy_modification_enabled: bool,
        has_existing_data: bool,
    ) -> Self {
        Self {
            status,
            policy_modification_enabled,
            has_existing_data,
            editing: false,
            existing: UniformSizes::default(),
        }
    }

    pub fn from_record(record: &StudentRecord, policy: ModificationPolicy) -> Self {
        Self {
            status: record.status,
            policy_modification_enabled: policy.approval_required(),
            has_existing_data: record.has_existing_data(),
            editing: false,
            existing: record.sizes.clone(),
        }
    }

    pub fn editing(mut self, editing: bool) -> Self {
        self.editing = editing;
        self
    }
}

/// The decision table.
pub fn decide(input: &LifecycleInput) -> ViewMode {
    if input.policy_modification_enabled && input.status == RequestStatus::ModificationRequested {
        return ViewMode::WaitingApproval;
    }
    if input.has_existing_data && !input.status.is_owner_editable() && !input.editing {
        let edit = if input.policy_modification_enabled {
            EditAction::RequestEdit
        } else {
            EditAction::BeginEdit
        };
        return ViewMode::ReadOnly { edit };
    }
    ViewMode::EditForm {
        prefill: input.existing.clone(),
    }
}

/// Something that happened to an owner's session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Record re-read after `refresh`.
    Refreshed(StudentRecord),
    /// Record re-read after a successful request-modification call.
    EditRequested(StudentRecord),
    /// Local-only switch into the form.
    BeginEdit,
    /// Submission accepted by the store.
    Submitted(SizeRequest),
}

impl LifecycleEvent {
    pub fn action(&self) -> OwnerAction {
        match self {
            LifecycleEvent::Refreshed(_) => OwnerAction::Refresh,
            LifecycleEvent::EditRequested(_) => OwnerAction::RequestEdit,
            LifecycleEvent::BeginEdit => OwnerAction::BeginEdit,
            LifecycleEvent::Submitted(_) => OwnerAction::Submit,
        }
    }
}

/// Owner-side state: the last fetched record, the session's policy, and the
/// derived mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerState {
    record: StudentRecord,
    policy: ModificationPolicy,
    editing: bool,
    mode: ViewMode,
}

impl OwnerState {
    /// Initial state from a freshly fetched record.
    pub fn load(record: StudentRecord, policy: &PolicyMessage) -> Self {
        Self::derive(record, policy.modification, false)
    }

    fn derive(record: StudentRecord, policy: ModificationPolicy, editing: bool) -> Self {
        let mode = decide(&LifecycleInput::from_record(&record, policy).editing(editing));
        Self {
            record,
            policy,
            editing,
            mode,
        }
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn record(&self) -> &StudentRecord {
        &self.record
    }

    pub fn policy(&self) -> ModificationPolicy {
        self.policy
    }

    /// Pure transition function. An event that is not legal in the current
    /// mode yields [PortalError::IllegalTransition].
    pub fn apply(&self, event: LifecycleEvent) -> Result<OwnerState, PortalError> {
        let action = event.action();
        if !self.mode.allows(action) {
            return Err(self.illegal(action));
        }

        match event {
            LifecycleEvent::Refreshed(record) | LifecycleEvent::EditRequested(record) => {
                self.ensure_same_student(&record)?;
                Ok(Self::derive(record, self.policy, false))
            }
            LifecycleEvent::BeginEdit => Ok(Self::derive(self.record.clone(), self.policy, true)),
            LifecycleEvent::Submitted(request) => {
                let mut record = self.record.clone();
                record.sizes = request.sizes;
                record.notes = request.notes;
                record.status = RequestStatus::Pending;
                Ok(Self {
                    record,
                    policy: self.policy,
                    editing: false,
                    mode: ViewMode::SubmittedConfirmation,
                })
            }
        }
    }

    /// Checks that leaving the machine with `action` is legal here.
    pub fn check_exit(&self, action: OwnerAction) -> Result<(), PortalError> {
        match action {
            OwnerAction::Cancel | OwnerAction::ResetToSearch if self.mode.allows(action) => Ok(()),
            _ => Err(self.illegal(action)),
        }
    }

    pub fn illegal(&self, action: OwnerAction) -> PortalError {
        PortalError::IllegalTransition {
            action: action.to_string(),
            mode: self.mode.to_string(),
        }
    }

    fn ensure_same_student(&self, record: &StudentRecord) -> Result<(), PortalError> {
        if record.student_id != self.record.student_id {
            return Err(PortalError::Conflict(format!(
                "fetched record {} does not belong to session student {}",
                record.student_id, self.record.student_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StudentProfile;
    use crate::size::SizeLabel;
    use strum::IntoEnumIterator;

    const ENABLED: ModificationPolicy = ModificationPolicy::Enabled;
    const DISABLED: ModificationPolicy = ModificationPolicy::Disabled;

    fn record(status: RequestStatus, sizes: UniformSizes) -> StudentRecord {
        let mut record = StudentRecord::enrolled("KTS-1", StudentProfile::default());
        record.status = status;
        record.sizes = sizes;
        record
    }

    fn some_sizes() -> UniformSizes {
        UniformSizes::new(Some(SizeLabel::M), Some(SizeLabel::L), None)
    }

    fn policy(modification: ModificationPolicy) -> PolicyMessage {
        PolicyMessage::new("", "", modification)
    }

    #[test]
    fn unset_and_modifiable_always_start_in_edit_form() {
        for status in [RequestStatus::Unset, RequestStatus::Modifiable] {
            for sizes in [UniformSizes::default(), some_sizes()] {
                for modification in [ENABLED, DISABLED] {
                    let state = OwnerState::load(record(status, sizes.clone()), &policy(modification));
                    assert_eq!(
                        state.mode(),
                        &ViewMode::EditForm { prefill: sizes.clone() },
                        "status={status} policy={modification}"
                    );
                }
            }
        }
    }

    #[test]
    fn unset_with_sizes_is_editable_under_either_policy() {
        for enabled in [true, false] {
            let input = LifecycleInput {
                existing: some_sizes(),
                ..LifecycleInput::new(RequestStatus::Unset, enabled, true)
            };
            assert_eq!(
                decide(&input),
                ViewMode::EditForm {
                    prefill: some_sizes()
                }
            );
            let state = OwnerState::load(record(RequestStatus::Unset, some_sizes()), &policy(
                if enabled { ENABLED } else { DISABLED },
            ));
            assert!(state.mode().allows(OwnerAction::Submit));
        }
    }

    #[test]
    fn no_existing_data_routes_to_edit_form_except_waiting_gate() {
        for status in RequestStatus::iter() {
            let mode = decide(&LifecycleInput::new(status, false, false));
            assert!(matches!(mode, ViewMode::EditForm { .. }), "{status}");
        }
        let gated = decide(&LifecycleInput::new(
            RequestStatus::ModificationRequested,
            true,
            false,
        ));
        assert_eq!(gated, ViewMode::WaitingApproval);
    }

    #[test]
    fn pending_with_data_under_approval_policy_is_read_only_with_request_edit() {
        let state = OwnerState::load(record(RequestStatus::Pending, some_sizes()), &policy(ENABLED));
        assert_eq!(
            state.mode(),
            &ViewMode::ReadOnly {
                edit: EditAction::RequestEdit
            }
        );
        let mutating: Vec<_> = state
            .mode()
            .legal_actions()
            .iter()
            .copied()
            .filter(|a| a.mutates_store())
            .collect();
        assert_eq!(mutating, vec![OwnerAction::RequestEdit]);
    }

    #[test]
    fn request_edit_then_refetch_waits_for_approval() {
        let state = OwnerState::load(record(RequestStatus::Approved, some_sizes()), &policy(ENABLED));
        let next = state
            .apply(LifecycleEvent::EditRequested(record(
                RequestStatus::ModificationRequested,
                some_sizes(),
            )))
            .unwrap();
        assert_eq!(next.mode(), &ViewMode::WaitingApproval);
        assert_eq!(
            next.mode().legal_actions(),
            &[OwnerAction::Refresh, OwnerAction::Cancel]
        );
    }

    #[test]
    fn refresh_is_idempotent_without_staff_action() {
        let waiting = record(RequestStatus::ModificationRequested, some_sizes());
        let mut state = OwnerState::load(waiting.clone(), &policy(ENABLED));
        for _ in 0..3 {
            state = state
                .apply(LifecycleEvent::Refreshed(waiting.clone()))
                .unwrap();
            assert_eq!(state.mode(), &ViewMode::WaitingApproval);
        }
    }

    #[test]
    fn refresh_after_allow_edit_opens_the_form() {
        let state = OwnerState::load(
            record(RequestStatus::ModificationRequested, some_sizes()),
            &policy(ENABLED),
        );
        let next = state
            .apply(LifecycleEvent::Refreshed(record(
                RequestStatus::Modifiable,
                some_sizes(),
            )))
            .unwrap();
        assert_eq!(
            next.mode(),
            &ViewMode::EditForm {
                prefill: some_sizes()
            }
        );
    }

    #[test]
    fn begin_edit_is_local_and_only_without_approval_policy() {
        let disabled =
            OwnerState::load(record(RequestStatus::Pending, some_sizes()), &policy(DISABLED));
        assert_eq!(
            disabled.mode(),
            &ViewMode::ReadOnly {
                edit: EditAction::BeginEdit
            }
        );
        let editing = disabled.apply(LifecycleEvent::BeginEdit).unwrap();
        assert!(matches!(editing.mode(), ViewMode::EditForm { .. }));
        assert_eq!(editing.record().status, RequestStatus::Pending);

        let enabled =
            OwnerState::load(record(RequestStatus::Pending, some_sizes()), &policy(ENABLED));
        let err = enabled.apply(LifecycleEvent::BeginEdit).unwrap_err();
        assert!(matches!(err, PortalError::IllegalTransition { .. }));
    }

    #[test]
    fn policy_disabled_ignores_modification_requested_gate() {
        let state = OwnerState::load(
            record(RequestStatus::ModificationRequested, some_sizes()),
            &policy(DISABLED),
        );
        assert_eq!(
            state.mode(),
            &ViewMode::ReadOnly {
                edit: EditAction::BeginEdit
            }
        );
    }

    #[test]
    fn submit_reaches_terminal_confirmation() {
        let state = OwnerState::load(record(RequestStatus::Unset, UniformSizes::default()), &policy(ENABLED));
        let request = SizeRequest::new(some_sizes(), "");
        let done = state.apply(LifecycleEvent::Submitted(request)).unwrap();
        assert_eq!(done.mode(), &ViewMode::SubmittedConfirmation);
        assert!(done.mode().is_terminal());
        assert_eq!(done.record().status, RequestStatus::Pending);
        assert_eq!(done.record().sizes.shirt, Some(SizeLabel::M));
        assert_eq!(done.mode().legal_actions(), &[OwnerAction::ResetToSearch]);

        let again = done.apply(LifecycleEvent::Submitted(SizeRequest::new(some_sizes(), "")));
        assert!(matches!(again, Err(PortalError::IllegalTransition { .. })));
        assert!(done.check_exit(OwnerAction::ResetToSearch).is_ok());
        assert!(done.check_exit(OwnerAction::Cancel).is_err());
    }

    #[test]
    fn illegal_events_leave_state_untouched() {
        let state = OwnerState::load(record(RequestStatus::Approved, some_sizes()), &policy(ENABLED));
        let before = state.clone();
        let err = state
            .apply(LifecycleEvent::Submitted(SizeRequest::new(some_sizes(), "")))
            .unwrap_err();
        assert_eq!(
            err,
            PortalError::IllegalTransition {
                action: "submit".into(),
                mode: "READ_ONLY".into()
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn refetch_for_another_student_is_rejected() {
        let state = OwnerState::load(
            record(RequestStatus::ModificationRequested, some_sizes()),
            &policy(ENABLED),
        );
        let mut other = record(RequestStatus::Modifiable, some_sizes());
        other.student_id = "KTS-2".into();
        assert!(matches!(
            state.apply(LifecycleEvent::Refreshed(other)),
            Err(PortalError::Conflict(_))
        ));
    }
}

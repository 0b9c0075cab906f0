//! Command dispatcher: control-plane calls plus optimistic registry nudges.
//!
//! The control plane sits behind the [`ControlPlane`] trait so the
//! dispatcher can be exercised without a network. Precedence rule for the
//! registry: optimistic write, authoritative overwrite — the dispatcher's
//! guess is never reconciled or rolled back, the unit's next real frame
//! simply replaces it.

use async_trait::async_trait;
use tracing::{debug, info};

use gridlight_core::{
    Cluster, Command, CommandBody, CommandKind, GridlightError, Result, SchedulePayload, UnitId,
};

use crate::registry::StatusRegistry;

/// The REST collaborator: roster fetches and command calls.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch the current cluster roster.
    async fn fetch_roster(&self) -> Result<Vec<Cluster>>;

    /// Submit one command for one unit. Synchronous success/failure, no
    /// streaming, no retry.
    async fn send_command(&self, unit_id: UnitId, body: &CommandBody) -> Result<()>;
}

/// Sends typed commands for units and optimistically nudges the registry.
pub struct CommandDispatcher<C> {
    control: C,
    registry: StatusRegistry,
}

impl<C: ControlPlane> CommandDispatcher<C> {
    #[must_use]
    pub fn new(control: C, registry: StatusRegistry) -> Self {
        Self { control, registry }
    }

    /// Flip a unit's relay, returning the optimistic new state.
    ///
    /// # Errors
    ///
    /// [`GridlightError::NotConnected`] if the unit has never reported or is
    /// currently dark — commanding a dark unit is meaningless and must not
    /// desynchronize display state, so no network call is made. Control-plane
    /// failures are surfaced as-is; the optimistic flip is left in place for
    /// the next authoritative frame to correct.
    pub async fn toggle(&self, unit_id: UnitId) -> Result<bool> {
        let status = self
            .registry
            .read(unit_id)
            .ok_or(GridlightError::NotConnected(unit_id))?;
        if !status.is_connected {
            return Err(GridlightError::NotConnected(unit_id));
        }

        let desired = !status.is_on;
        self.registry.apply_optimistic_toggle(unit_id, desired);
        debug!(unit = %unit_id, desired, "optimistic toggle applied");

        self.control
            .send_command(unit_id, &CommandBody::toggle(desired))
            .await?;
        info!(unit = %unit_id, on = desired, "toggle command sent");
        Ok(desired)
    }

    /// Program a unit's on/off schedule.
    ///
    /// # Errors
    ///
    /// [`GridlightError::Validation`] if any field is out of range; the
    /// payload never reaches the network in that case.
    pub async fn schedule(&self, unit_id: UnitId, payload: SchedulePayload) -> Result<()> {
        payload.validate()?;
        self.control
            .send_command(unit_id, &CommandBody::Schedule(payload))
            .await?;
        info!(unit = %unit_id, "schedule command sent");
        Ok(())
    }

    /// Route a typed [`Command`] to the matching operation.
    pub async fn dispatch(&self, command: Command) -> Result<()> {
        match command.kind {
            CommandKind::Toggle => self.toggle(command.unit_id).await.map(|_| ()),
            CommandKind::Schedule(payload) => self.schedule(command.unit_id, payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlight_core::{StatusFrame, TelemetryEvent};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeControlPlane {
        sent: Mutex<Vec<(UnitId, CommandBody)>>,
        fail: bool,
    }

    impl FakeControlPlane {
        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn sent(&self) -> Vec<(UnitId, CommandBody)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl ControlPlane for FakeControlPlane {
        async fn fetch_roster(&self) -> Result<Vec<Cluster>> {
            Ok(Vec::new())
        }

        async fn send_command(&self, unit_id: UnitId, body: &CommandBody) -> Result<()> {
            if self.fail {
                return Err(GridlightError::ControlPlane("503 service unavailable".into()));
            }
            self.sent.lock().push((unit_id, *body));
            Ok(())
        }
    }

    fn connected_registry(unit_id: UnitId, is_on: bool) -> StatusRegistry {
        let registry = StatusRegistry::new();
        registry.apply_event(
            unit_id,
            &TelemetryEvent::Status(StatusFrame {
                power: 12.0,
                current: 0.3,
                voltage: 230.0,
                toggle: u8::from(is_on),
                position: None,
            }),
        );
        registry
    }

    fn valid_schedule() -> SchedulePayload {
        SchedulePayload {
            hour_on: 18,
            minute_on: 0,
            hour_off: 6,
            minute_off: 30,
        }
    }

    #[tokio::test]
    async fn toggle_flips_connected_unit_and_sends_inverse() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, false);
        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry.clone());

        let new_state = dispatcher.toggle(unit).await.unwrap();
        assert!(new_state);
        assert!(registry.read(unit).unwrap().is_on);
        assert_eq!(
            dispatcher.control.sent(),
            vec![(unit, CommandBody::toggle(true))]
        );
    }

    #[tokio::test]
    async fn toggle_rejects_disconnected_unit_without_network_call() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, true);
        registry.apply_event(unit, &TelemetryEvent::Liveness { alive: false });
        let before = registry.read(unit).unwrap();

        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry.clone());
        let result = dispatcher.toggle(unit).await;

        assert!(matches!(result, Err(GridlightError::NotConnected(id)) if id == unit));
        assert!(dispatcher.control.sent().is_empty());
        // Registry untouched by the rejected command.
        assert_eq!(registry.read(unit).unwrap().is_on, before.is_on);
    }

    #[tokio::test]
    async fn toggle_rejects_unknown_unit() {
        let registry = StatusRegistry::new();
        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry);

        assert!(matches!(
            dispatcher.toggle(UnitId(9)).await,
            Err(GridlightError::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn control_plane_failure_surfaces_without_rollback() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, false);
        let dispatcher = CommandDispatcher::new(FakeControlPlane::failing(), registry.clone());

        let result = dispatcher.toggle(unit).await;
        assert!(matches!(result, Err(GridlightError::ControlPlane(_))));
        // No rollback: the next authoritative frame self-corrects.
        assert!(registry.read(unit).unwrap().is_on);
    }

    #[tokio::test]
    async fn invalid_schedule_fails_locally() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, false);
        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry);

        let payload = SchedulePayload {
            hour_on: 25,
            ..valid_schedule()
        };
        assert!(matches!(
            dispatcher.schedule(unit, payload).await,
            Err(GridlightError::Validation(_))
        ));
        assert!(dispatcher.control.sent().is_empty());
    }

    #[tokio::test]
    async fn valid_schedule_is_sent() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, false);
        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry);

        dispatcher.schedule(unit, valid_schedule()).await.unwrap();
        assert_eq!(
            dispatcher.control.sent(),
            vec![(unit, CommandBody::Schedule(valid_schedule()))]
        );
    }

    #[tokio::test]
    async fn dispatch_routes_by_kind() {
        let unit = UnitId(1);
        let registry = connected_registry(unit, false);
        let dispatcher = CommandDispatcher::new(FakeControlPlane::default(), registry.clone());

        dispatcher
            .dispatch(Command {
                unit_id: unit,
                kind: CommandKind::Toggle,
            })
            .await
            .unwrap();
        assert!(registry.read(unit).unwrap().is_on);

        dispatcher
            .dispatch(Command {
                unit_id: unit,
                kind: CommandKind::Schedule(valid_schedule()),
            })
            .await
            .unwrap();
        assert_eq!(dispatcher.control.sent().len(), 2);
    }
}

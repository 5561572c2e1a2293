//! In-memory roll book driving the shared stock engine the way the services
//! drive PostgreSQL: validate first, then apply every movement, and keep
//! nothing when a step fails.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::history::{reconstruct_history, RollHistory};
use shared::ledger::{plan_movement, RollBalance};
use shared::reservation::{
    accumulate_reservations, validate_reservations, ReservationRequest, RollSnapshot,
};
use shared::{DomainResult, FabricRoll, MovementKind, RollReservation, RollStatus, StockMovement};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredRoll {
    pub roll: FabricRoll,
    pub color_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct RollBook {
    pub rolls: HashMap<Uuid, StoredRoll>,
    pub movements: Vec<StockMovement>,
    /// Reserved weight per (batch, roll)
    pub reservations: HashMap<(Uuid, Uuid), RollReservation>,
    /// Fabric each batch was opened with
    pub batch_fabrics: HashMap<Uuid, Uuid>,
    sequence: i64,
    /// Every movement shares this instant so replay order rests on the sequence
    clock: DateTime<Utc>,
}

impl RollBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock a roll the way roll creation does: empty row, opening entry,
    /// then an adjustment when it arrives partly used
    pub fn stock(
        &mut self,
        fabric_id: Uuid,
        color_id: Uuid,
        initial: Decimal,
        current: Decimal,
        user: Uuid,
    ) -> DomainResult<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.rolls.insert(
            id,
            StoredRoll {
                roll: FabricRoll {
                    id,
                    fabric_id,
                    barcode: None,
                    initial_weight_kg: initial,
                    current_weight_kg: Decimal::ZERO,
                    status: RollStatus::Available,
                    created_at: now,
                    updated_at: now,
                },
                color_id,
            },
        );
        self.apply(id, user, MovementKind::Entry, initial, Some(RollStatus::Available))?;
        if current < initial {
            self.apply(id, user, MovementKind::Adjustment, current, Some(RollStatus::Available))?;
        }
        Ok(id)
    }

    pub fn roll(&self, id: Uuid) -> &FabricRoll {
        &self.rolls[&id].roll
    }

    pub fn weight(&self, id: Uuid) -> Decimal {
        self.roll(id).current_weight_kg
    }

    pub fn movements_of(&self, id: Uuid) -> Vec<&StockMovement> {
        self.movements.iter().filter(|m| m.roll_id == id).collect()
    }

    /// One ledger movement
    pub fn apply(
        &mut self,
        roll_id: Uuid,
        user_id: Uuid,
        kind: MovementKind,
        weight: Decimal,
        status_when_remaining: Option<RollStatus>,
    ) -> DomainResult<()> {
        let stored = self
            .rolls
            .get_mut(&roll_id)
            .ok_or(shared::DomainError::RollNotFound(roll_id))?;
        let mut balance = RollBalance::from(&stored.roll);
        let effect = plan_movement(&balance, kind, weight, status_when_remaining)?;
        balance.apply(&effect);
        stored.roll.current_weight_kg = balance.current_weight_kg;
        stored.roll.status = balance.status;

        self.sequence += 1;
        self.movements.push(StockMovement {
            id: Uuid::new_v4(),
            roll_id,
            user_id,
            kind,
            weight_kg: effect.recorded_weight_kg,
            sequence: self.sequence,
            created_at: self.clock,
        });
        Ok(())
    }

    pub fn snapshots(&self, requests: &[ReservationRequest]) -> Vec<RollSnapshot> {
        requests
            .iter()
            .filter_map(|r| self.rolls.get(&r.roll_id))
            .map(|s| RollSnapshot {
                id: s.roll.id,
                fabric_id: s.roll.fabric_id,
                color_id: s.color_id,
                initial_weight_kg: s.roll.initial_weight_kg,
                current_weight_kg: s.roll.current_weight_kg,
                status: s.roll.status,
            })
            .collect()
    }

    /// Reserve for a batch: validate, require one fabric, exit every grouped
    /// roll. All or nothing.
    pub fn reserve(&mut self, requests: &[ReservationRequest], user: Uuid) -> DomainResult<Uuid> {
        let validated = validate_reservations(requests, self.snapshots(requests))?;
        let fabric_id = validated.single_fabric()?;

        let mut staged = self.clone();
        for g in &validated.grouped {
            staged.apply(g.roll_id, user, MovementKind::Exit, g.weight_kg, Some(RollStatus::Available))?;
        }
        *self = staged;
        Ok(fabric_id)
    }

    /// Reserve for `batch_id` the way batch creation and item addition do.
    /// The first call fixes the batch fabric; later calls must match it and
    /// add to what the batch already holds.
    pub fn reserve_for_batch(
        &mut self,
        batch_id: Uuid,
        requests: &[ReservationRequest],
        user: Uuid,
    ) -> DomainResult<()> {
        let validated = validate_reservations(requests, self.snapshots(requests))?;
        let fabric_id = match self.batch_fabrics.get(&batch_id) {
            Some(&fabric_id) => {
                validated.ensure_fabric(fabric_id)?;
                fabric_id
            }
            None => validated.single_fabric()?,
        };

        let mut staged = self.clone();
        for g in &validated.grouped {
            staged.apply(g.roll_id, user, MovementKind::Exit, g.weight_kg, Some(RollStatus::Available))?;
        }
        let held: Vec<RollReservation> = staged
            .reservations
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect();
        for row in accumulate_reservations(batch_id, &held, &validated.grouped) {
            staged.reservations.insert((batch_id, row.roll_id), row);
        }
        staged.batch_fabrics.insert(batch_id, fabric_id);
        *self = staged;
        Ok(())
    }

    pub fn reserved(&self, batch_id: Uuid, roll_id: Uuid) -> Option<Decimal> {
        self.reservations
            .get(&(batch_id, roll_id))
            .map(|r| r.reserved_weight_kg)
    }

    pub fn history(&self, roll_id: Uuid) -> RollHistory {
        reconstruct_history(self.roll(roll_id), &self.movements)
    }
}

pub fn request(roll_id: Uuid, weight: Decimal, color: Option<Uuid>) -> ReservationRequest {
    ReservationRequest {
        roll_id,
        weight_kg: weight,
        declared_color_id: color,
    }
}

use super::context::TickContext;
use super::system::{GameSystem, TickFrequency};
use crate::engine::{self, IncomeReport, SweepReport};

/// Pays income every six hours.
#[derive(Debug, Default)]
pub struct IncomeSystem {
    pub last_report: Option<IncomeReport>,
}

impl GameSystem for IncomeSystem {
    fn name(&self) -> &str {
        "income"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::SixHourly
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        self.last_report = Some(engine::run_income_cycle(ctx.world, ctx.now));
    }
}

/// Resolves arrived convoys and due attacks every minute.
#[derive(Debug, Default)]
pub struct SweepSystem {
    pub resolved: u64,
    pub last_report: Option<SweepReport>,
}

impl GameSystem for SweepSystem {
    fn name(&self) -> &str {
        "sweep"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::EveryMinute
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let report = engine::sweep_convoys_and_attacks(ctx.world, ctx.rng, ctx.now);
        self.resolved += (report.convoys.len() + report.attacks.len()) as u64;
        self.last_report = Some(report);
    }
}

/// The two periodic jobs the game needs.
pub fn game_systems() -> Vec<Box<dyn GameSystem>> {
    vec![Box::new(IncomeSystem::default()), Box::new(SweepSystem::default())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildingKind;
    use crate::engine::ConvoyOrder;
    use crate::engine::convoy::create_convoy;
    use crate::model::{ConvoyStatus, Payload};
    use crate::testutil::{FixedRng, TestWorld, hours, minutes, tick_system, tick_system_with};

    #[test]
    fn income_system_pays_players() {
        let mut t = TestWorld::new();
        let a = t.player("ir");
        t.give_building(a, BuildingKind::Farm, 2);
        let mut system = IncomeSystem::default();
        tick_system(&mut t.world, &mut system, hours(6), 1);
        assert_eq!(t.player_row(a).money, 102_000);
        assert_eq!(system.last_report.unwrap().paid, vec![a]);
        assert_eq!(t.world.current_time, hours(6));
    }

    #[test]
    fn sweep_system_resolves_due_convoys() {
        let mut t = TestWorld::new();
        let a = t.player("ir");
        let b = t.player("iq");
        let receipt = create_convoy(
            &mut t.world,
            a,
            b,
            ConvoyOrder::new(Payload::money(10)),
            minutes(0),
        )
        .unwrap();
        let mut system = SweepSystem::default();
        let mut rng = FixedRng::low();
        tick_system_with(&mut t.world, &mut system, minutes(29), &mut rng);
        assert_eq!(system.resolved, 0);
        tick_system_with(&mut t.world, &mut system, minutes(30), &mut rng);
        assert_eq!(system.resolved, 1);
        assert_eq!(
            t.world.convoys[&receipt.convoy.id].status,
            ConvoyStatus::Delivered
        );
    }
}

use stagehand_core::{Gait, Navigator, Pos};

const WALK_STEP: f32 = 0.06;
const RUN_STEP: f32 = 0.18;

/// Deterministic straight-line mover with fixed per-tick speeds, so the
/// regression artefacts are stable across runs.
pub struct LineNavigator {
    position: Pos,
    waypoints: Vec<Pos>,
    gait: Gait,
}

impl LineNavigator {
    pub fn new(position: Pos) -> Self {
        LineNavigator {
            position,
            waypoints: Vec::new(),
            gait: Gait::Walk,
        }
    }

    fn step(&self) -> f32 {
        match self.gait {
            Gait::Walk => WALK_STEP,
            Gait::Run => RUN_STEP,
        }
    }
}

impl Navigator for LineNavigator {
    fn compute_path(&self, _from: Pos, _to: Pos) -> Vec<Pos> {
        // straight-line world: moving directly is always valid
        Vec::new()
    }

    fn move_along(&mut self, waypoints: Vec<Pos>, gait: Gait) {
        self.waypoints = waypoints;
        self.gait = gait;
    }

    fn is_moving(&self) -> bool {
        !self.waypoints.is_empty()
    }

    fn teleport(&mut self, position: Pos) {
        self.position = position;
        self.waypoints.clear();
    }

    fn stop(&mut self) {
        self.waypoints.clear();
    }

    fn position(&self) -> Pos {
        self.position
    }

    fn tick(&mut self) {
        let Some(target) = self.waypoints.first().copied() else {
            return;
        };
        let step = self.step();
        let distance = self.position.distance(target);
        if distance <= step {
            self.position = target;
            self.waypoints.remove(0);
            return;
        }
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        self.position.x += dx / distance * step;
        self.position.y += dy / distance * step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_waypoints_in_order_at_fixed_speed() {
        let mut navigator = LineNavigator::new(Pos::new(0.0, 0.0));
        navigator.move_along(vec![Pos::new(0.12, 0.0), Pos::new(0.12, 0.06)], Gait::Walk);
        navigator.tick();
        assert!((navigator.position().x - 0.06).abs() < 1e-5);
        navigator.tick();
        navigator.tick();
        assert_eq!(navigator.position(), Pos::new(0.12, 0.06));
        assert!(!navigator.is_moving());
    }

    #[test]
    fn running_covers_three_times_the_ground() {
        let mut navigator = LineNavigator::new(Pos::new(0.0, 0.0));
        navigator.move_along(vec![Pos::new(1.0, 0.0)], Gait::Run);
        navigator.tick();
        assert!((navigator.position().x - 0.18).abs() < 1e-5);
    }

    #[test]
    fn teleport_discards_pending_waypoints() {
        let mut navigator = LineNavigator::new(Pos::new(0.0, 0.0));
        navigator.move_along(vec![Pos::new(1.0, 0.0)], Gait::Walk);
        navigator.teleport(Pos::new(5.0, 5.0));
        assert!(!navigator.is_moving());
        assert_eq!(navigator.position(), Pos::new(5.0, 5.0));
    }
}

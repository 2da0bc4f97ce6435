#[derive(Debug, Clone, Default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
}

impl PacketLossSimulation {
    pub fn new(loss_percent: f32) -> Self {
        Self {
            enabled: true,
            loss_percent: loss_percent.clamp(0.0, 100.0),
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rand::random::<f32>() * 100.0 < self.loss_percent
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    /// Outbound datagrams discarded by loss simulation.
    pub packets_dropped: u64,
    /// Inbound datagrams that failed framing validation.
    pub packets_rejected: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_simulation_never_drops() {
        let sim = PacketLossSimulation::default();
        assert!((0..1000).all(|_| !sim.should_drop()));
    }

    #[test]
    fn test_full_loss_always_drops() {
        let sim = PacketLossSimulation::new(100.0);
        assert!((0..1000).all(|_| sim.should_drop()));
    }

    #[test]
    fn test_loss_percent_clamped() {
        assert_eq!(PacketLossSimulation::new(250.0).loss_percent, 100.0);
        assert_eq!(PacketLossSimulation::new(-3.0).loss_percent, 0.0);
    }
}

//! RFC 7540 §6.9 flow-control window bookkeeping, shared shape for the connection window and
//! every stream's window: grounded on `examples/carllerche-h2/src/proto/streams/flow_control.rs`
//! for the "send a WINDOW_UPDATE once consumed crosses half the initial window" policy, which
//! bounds the number of WINDOW_UPDATE frames without starving the sender.

pub(super) const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;

/// Tracks one side (send or receive) of a 31-bit flow-control window.
#[derive(Debug, Clone, Copy)]
pub(super) struct FlowWindow {
    available: i64,
    initial: u32,
    consumed_since_update: u32,
}

impl FlowWindow {
    pub(super) fn new(initial: u32) -> Self {
        Self {
            available: initial as i64,
            initial,
            consumed_since_update: 0,
        }
    }

    pub(super) fn available(&self) -> i64 {
        self.available
    }

    /// Applies a `WINDOW_UPDATE` increment received from the peer (send-side window).
    pub(super) fn increment(&mut self, delta: u32) {
        self.available += delta as i64;
    }

    /// Deducts `size` bytes sent against this (send-side) window.
    pub(super) fn deduct(&mut self, size: u32) {
        self.available -= size as i64;
    }

    /// Applies a `SETTINGS_INITIAL_WINDOW_SIZE` change, shifting `available` by the delta per
    /// RFC 7540 §6.9.2 rather than resetting it outright.
    pub(super) fn apply_initial_window_change(&mut self, new_initial: u32) {
        let delta = new_initial as i64 - self.initial as i64;
        self.available += delta;
        self.initial = new_initial;
    }

    /// Records `size` bytes received (receive-side window); returns the `WINDOW_UPDATE`
    /// increment to send back once consumption has crossed half of the initial window, or
    /// `None` if it's not time to send one yet.
    pub(super) fn on_received(&mut self, size: u32) -> Option<u32> {
        self.available -= size as i64;
        self.consumed_since_update += size;
        if self.consumed_since_update >= self.initial / 2 {
            let increment = self.consumed_since_update;
            self.consumed_since_update = 0;
            self.available += increment as i64;
            Some(increment)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_update_increases_available_send_budget() {
        let mut window = FlowWindow::new(100);
        window.deduct(100);
        assert_eq!(window.available(), 0);
        window.increment(50);
        assert_eq!(window.available(), 50);
    }

    #[test]
    fn receive_side_proposes_update_at_half_window() {
        let mut window = FlowWindow::new(100);
        assert_eq!(window.on_received(40), None);
        assert_eq!(window.on_received(20), Some(60));
    }

    #[test]
    fn initial_window_change_shifts_available_by_the_delta() {
        let mut window = FlowWindow::new(100);
        window.deduct(30);
        assert_eq!(window.available(), 70);
        window.apply_initial_window_change(200);
        assert_eq!(window.available(), 170);
    }
}

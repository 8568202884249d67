/// Rolling history for live charts
///
/// - `channel_window`: bounded FIFO of timestamped, labeled series
/// - `live_view`: the voltage, current and pf/thd windows plus latest readouts
pub mod channel_window;
pub mod live_view;

pub use channel_window::{ChannelWindow, WindowSnapshot, DEFAULT_WINDOW_CAPACITY};
pub use live_view::{LiveReadouts, LiveView, LiveViewSnapshot};

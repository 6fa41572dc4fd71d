/// Progress of the dispatcher, sent on the side channel to the status aggregator.
///
/// `Running` is sent at a coarse interval while input is still being read.
/// `Total` is sent exactly once when the input is exhausted; the channel is closed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountUpdate {
    Running(u64),
    Total(u64),
}

use tokio::sync::mpsc;

use crate::bid::BidInfo;

/// The auction mechanism that accounts for admitted bids and later executes
/// the winning bundle.
pub trait AuctionSettlement: Send + Sync {
    /// Hands over a locally validated bid.
    fn submit_bid(&self, bid: BidInfo) -> Result<(), SettlementError>;
}

/// Reasons the settlement mechanism refuses a bid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    /// Nobody is listening for bids anymore.
    #[error("settlement channel is closed")]
    Closed,
    /// The auction refused the bid.
    #[error("bid refused: {0}")]
    Refused(String),
}

/// Forwards bids to an in-process auction over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSettlement {
    sender: mpsc::UnboundedSender<BidInfo>,
}

impl ChannelSettlement {
    /// Creates the settlement handle together with the auction's receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BidInfo>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AuctionSettlement for ChannelSettlement {
    fn submit_bid(&self, bid: BidInfo) -> Result<(), SettlementError> {
        self.sender.send(bid).map_err(|_| SettlementError::Closed)
    }
}

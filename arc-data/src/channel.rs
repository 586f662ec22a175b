/// Public/private data channels a [`crate::client::ExchangeWsProtocol`] can subscribe
/// to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Channel {
    OrderBookL1,
    OrderBookL2,
    Trades,
    PrivateOrders,
    PrivateBalances,
    PrivateTrades,
}

impl Channel {
    pub fn is_private(self) -> bool {
        matches!(
            self,
            Channel::PrivateOrders | Channel::PrivateBalances | Channel::PrivateTrades
        )
    }
}

use bytes::Bytes;
use uuid::Uuid;

use crate::names::BridgeRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A client-issued RPC re-expressed as an HTTP exchange with the broker.
    Outbound,
    /// An HTTP request replayed as an RPC invocation.
    Inbound,
}

/// One bridged call: created per call, dropped once the HTTP exchange completes.
#[derive(Debug, Clone)]
pub struct TranscodedInteraction {
    id: Uuid,
    route: BridgeRoute,
    payload: Bytes,
    direction: Direction,
}

impl TranscodedInteraction {
    pub fn outbound(route: BridgeRoute, payload: Bytes) -> Self {
        Self::new(route, payload, Direction::Outbound)
    }

    pub fn inbound(route: BridgeRoute, payload: Bytes) -> Self {
        Self::new(route, payload, Direction::Inbound)
    }

    fn new(route: BridgeRoute, payload: Bytes, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            route,
            payload,
            direction,
        }
    }

    /// Correlates the log lines of a single interaction.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn route(&self) -> &BridgeRoute {
        &self.route
    }

    /// The JSON-encoded request message.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

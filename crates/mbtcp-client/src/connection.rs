use std::mem;

/// Connection state of a client.
///
/// A transport is either fully usable or gone; there is no half-closed
/// state. The sequencer only ever works on `Connected`, and every fatal
/// error moves the state back to `Disconnected` through [`Connection::take`].
#[derive(Debug)]
pub enum Connection<T> {
    Disconnected,
    Connected(T),
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl<T> Connection<T> {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Hands out the live transport, connecting through `connect` first when
    /// disconnected. `connect` runs at most once; a failed connect leaves the
    /// state `Disconnected`.
    pub fn get_or_try_connect<E>(
        &mut self,
        mut connect: impl FnMut() -> Result<T, E>,
    ) -> Result<&mut T, E> {
        loop {
            match self {
                Self::Connected(transport) => return Ok(transport),
                Self::Disconnected => *self = Self::Connected(connect()?),
            }
        }
    }

    /// Moves to `Disconnected`, returning the transport if there was one.
    pub fn take(&mut self) -> Option<T> {
        match mem::replace(self, Self::Disconnected) {
            Self::Connected(transport) => Some(transport),
            Self::Disconnected => None,
        }
    }
}

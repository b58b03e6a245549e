use core::fmt;

/// Why an owner refused to issue a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The owner has been retired; the borrow window is closed for good.
    Retired,
    /// The owner holds no value, so there is nothing to borrow.
    Vacant,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Retired => write!(f, "owner is retired, no new handles may be issued"),
            HandleError::Vacant => write!(f, "owner holds no value"),
        }
    }
}

impl std::error::Error for HandleError {}

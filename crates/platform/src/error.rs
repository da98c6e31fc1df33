//! Error taxonomy shared by every PWM operation.

use thiserror_no_std::Error;

use crate::pwm_types::{ChannelId, GroupId};

/// Errors returned by the PWM driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmError {
    /// The channel index does not exist on this hardware revision.
    #[error("channel {0} does not exist on this revision")]
    InvalidChannel(ChannelId),
    /// The channel must be initialised before this operation.
    #[error("channel {0} is not initialised")]
    ChannelNotInit(ChannelId),
    /// Period is zero, or the duty cycles do not fit inside the period.
    #[error("invalid period/duty combination")]
    InvalidPeriodDuty,
    /// No group occupies this slot.
    #[error("{0} does not exist")]
    GroupNotFound(GroupId),
    /// Both group channels are the same channel.
    #[error("group channels must differ")]
    GroupSameChannel,
    /// The channel pair already forms a group.
    #[error("group already exists")]
    GroupExists,
    /// The channel already belongs to another group.
    #[error("channel {0} already belongs to a group")]
    GroupChannelInUse(ChannelId),
    /// Group period/duty parameters are inconsistent.
    #[error("invalid group period/duty")]
    GroupDuty,
    /// The dead time does not fit the hardware generator.
    #[error("dead time of {0} cycles exceeds the hardware generator")]
    DeadTimeOutOfRange(u32),
    /// Every group slot is taken.
    #[error("group table is full")]
    GroupTableFull,
    /// A phase-shift chain needs between two and the maximum channel count.
    #[error("phase shift channel count out of range")]
    PhaseShiftChannelCount,
    /// No phase-shift chain is configured.
    #[error("phase shift is not configured")]
    PhaseShiftNotInit,
    /// No capture event arrived before the timeout.
    #[error("capture timed out before any sample arrived")]
    CaptureTimeout,
    /// Both-edge capture needs a period measured on a single edge first.
    #[error("capture period unknown, measure a single edge first")]
    CaptureNoPeriod,
    /// The hardware revision lacks the requested block.
    #[error("operation not supported by this hardware revision")]
    Unsupported,
}

impl embedded_hal::pwm::Error for PwmError {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

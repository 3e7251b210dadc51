use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// CALL with every stack slot in use
    #[error("stack overflow: CALL at 0x{pc:03x} exceeds {depth} nested subroutines")]
    StackOverflow { pc: u16, depth: usize },
    /// RET with an empty stack
    #[error("stack underflow: RET at 0x{pc:03x} with an empty call stack")]
    StackUnderflow { pc: u16 },
    #[error("ROM is {size} bytes, at most {max} bytes fit above 0x200")]
    RomTooLarge { size: usize, max: usize },
    #[error("no ROM was provided")]
    MissingRom,
    #[error("font sprite must be 80 bytes, got {0}")]
    InvalidFont(usize),
    #[error("clock rate must be a positive number of cycles per second")]
    InvalidClockRate,
    #[error("key 0x{0:x} is outside the 16-key keypad")]
    InvalidKey(u8),
}

impl Error {
    /// Faults that end the emulation session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::StackOverflow { .. } | Error::StackUnderflow { .. }
        )
    }
}

use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    RegistryFull,
    ChangerNotFound,
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryFull => write!(f, "Changer registry is full"),
            Self::ChangerNotFound => write!(f, "Changer not found"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

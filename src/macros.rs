//===========================================================================//

macro_rules! invalid_data {
    ($e:expr) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         $e))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         format!($fmt, $($arg)+)))
    };
}

macro_rules! invalid_input {
    ($e:expr) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidInput,
                                         $e))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidInput,
                                         format!($fmt, $($arg)+)))
    };
}

// Like `invalid_input!`, but for narrowing a size or offset into a fixed-width
// header field.
macro_rules! narrow {
    ($value:expr, $ty:ty, $what:expr) => {
        match <$ty>::try_from($value) {
            Ok(value) => value,
            Err(_) => invalid_input!(
                "{} does not fit in a {}-bit field (was {})",
                $what,
                <$ty>::BITS,
                $value
            ),
        }
    };
}

//===========================================================================//

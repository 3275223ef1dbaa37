pub mod exception;
pub mod function_code;
pub mod registers;

pub use exception::{ExceptionCode, ExceptionResponse};
pub use function_code::{EXCEPTION_FLAG, FunctionCode};
pub use registers::{MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, RegisterView, check_quantity};

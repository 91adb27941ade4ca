use crate::heap::ObjRef;
use std::fmt::Display;

/// Everything that can go wrong inside the VM.
///
/// Variants fall into two categories. VM-level failures (malformed class
/// files, corrupt pools, unimplemented opcodes, allocator breakage) are
/// diagnostics that terminate the process; they are never converted into
/// Java exceptions. `JavaException` carries a Java-level exception the
/// runtime decided to raise but has not yet materialized on the heap;
/// `JavaExceptionThrown` carries one that already exists as an object and
/// is unwinding the frame chain.
#[derive(Debug)]
pub enum JvmError {
    MainClassNotFound(String),
    ClassNotFoundOnClasspath(String),
    ClassFormat(String),
    InvalidConstantPoolIndex(u16),
    ConstantPoolTypeMismatch { index: u16, expected: &'static str },
    InvalidOpcode(u8),
    UnimplementedOpcode(u8),
    StackOverflow,
    FrameStackIsEmpty,
    OperandStackOverflow,
    OperandStackUnderflow,
    LocalVariableOutOfRange(u16),
    UnexpectedType(&'static str),
    WrongHeapAddress(usize),
    UnsatisfiedLink(String),
    Internal(String),
    JavaException(JavaExceptionFromVm),
    JavaExceptionThrown(ObjRef),
}

impl Display for JvmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JvmError::JavaException(ex) => {
                write!(f, "{}", ex.kind.class_name_dot())?;
                if let Some(msg) = &ex.message {
                    write!(f, ": {}", msg)?;
                }
                Ok(())
            }
            other => write!(f, "{:?}", other),
        }
    }
}

/// Internal exception identifiers, mapped to fully qualified class paths
/// for the exception classes the runtime itself raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaExceptionKind {
    NullPointerException,
    IndexOutOfBoundsException,
    ArrayIndexOutOfBoundsException,
    IncompatibleClassChangeError,
    NegativeArraySizeException,
    OutOfMemoryError,
    ClassNotFoundException,
    ArithmeticException,
    NoSuchFieldError,
    NoSuchMethodError,
    RuntimeException,
    IOException,
    FileNotFoundException,
    InterruptedException,
    NumberFormatException,
    StringIndexOutOfBoundsException,
    ClassCastException,
}

impl JavaExceptionKind {
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::NullPointerException => "java/lang/NullPointerException",
            Self::IndexOutOfBoundsException => "java/lang/IndexOutOfBoundsException",
            Self::ArrayIndexOutOfBoundsException => "java/lang/ArrayIndexOutOfBoundsException",
            Self::IncompatibleClassChangeError => "java/lang/IncompatibleClassChangeError",
            Self::NegativeArraySizeException => "java/lang/NegativeArraySizeException",
            Self::OutOfMemoryError => "java/lang/OutOfMemoryError",
            Self::ClassNotFoundException => "java/lang/ClassNotFoundException",
            Self::ArithmeticException => "java/lang/ArithmeticException",
            Self::NoSuchFieldError => "java/lang/NoSuchFieldError",
            Self::NoSuchMethodError => "java/lang/NoSuchMethodError",
            Self::RuntimeException => "java/lang/RuntimeException",
            Self::IOException => "java/io/IOException",
            Self::FileNotFoundException => "java/io/FileNotFoundException",
            Self::InterruptedException => "java/lang/InterruptedException",
            Self::NumberFormatException => "java/lang/NumberFormatException",
            Self::StringIndexOutOfBoundsException => {
                "java/lang/StringIndexOutOfBoundsException"
            }
            Self::ClassCastException => "java/lang/ClassCastException",
        }
    }

    pub fn class_name_dot(self) -> String {
        self.class_name().replace('/', ".")
    }
}

/// A Java exception the runtime wants to throw, before an instance exists
/// on the heap. The interpreter materializes it (load the class, allocate,
/// run the no-arg constructor) at the throw site.
#[derive(Debug, Clone)]
pub struct JavaExceptionFromVm {
    pub kind: JavaExceptionKind,
    pub message: Option<String>,
}

impl JavaExceptionFromVm {
    pub fn new(kind: JavaExceptionKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn with_message(kind: JavaExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }
}

impl From<JavaExceptionFromVm> for JvmError {
    fn from(value: JavaExceptionFromVm) -> Self {
        JvmError::JavaException(value)
    }
}

/// Builds a `JvmError::JavaException` from a kind and an optional
/// format-style message.
#[macro_export]
macro_rules! build_exception {
    ($kind:ident) => {
        $crate::error::JvmError::JavaException($crate::error::JavaExceptionFromVm::new(
            $crate::error::JavaExceptionKind::$kind,
        ))
    };
    ($kind:ident, $($arg:tt)+) => {
        $crate::error::JvmError::JavaException($crate::error::JavaExceptionFromVm::with_message(
            $crate::error::JavaExceptionKind::$kind,
            format!($($arg)+),
        ))
    };
}

/// `Err(build_exception!(..))`, for use as a tail expression or with `?`.
#[macro_export]
macro_rules! throw_exception {
    ($kind:ident) => {
        Err($crate::build_exception!($kind))
    };
    ($kind:ident, $($arg:tt)+) => {
        Err($crate::build_exception!($kind, $($arg)+))
    };
}

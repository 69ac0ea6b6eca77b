//! Names and module sets the rules match against.

use phf::phf_set;

/// Names exported by Python's `builtins` module (CPython 3.11 `dir(builtins)`).
static PYTHON_BUILTINS: phf::Set<&'static str> = phf_set! {
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
    "BytesWarning", "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
    "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
    "Ellipsis", "EncodingWarning", "EnvironmentError", "Exception", "ExceptionGroup",
    "False", "FileExistsError", "FileNotFoundError", "FloatingPointError", "FutureWarning",
    "GeneratorExit", "IOError", "ImportError", "ImportWarning", "IndentationError",
    "IndexError", "InterruptedError", "IsADirectoryError", "KeyError", "KeyboardInterrupt",
    "LookupError", "MemoryError", "ModuleNotFoundError", "NameError", "None",
    "NotADirectoryError", "NotImplemented", "NotImplementedError", "OSError",
    "OverflowError", "PendingDeprecationWarning", "PermissionError", "ProcessLookupError",
    "RecursionError", "ReferenceError", "ResourceWarning", "RuntimeError", "RuntimeWarning",
    "StopAsyncIteration", "StopIteration", "SyntaxError", "SyntaxWarning", "SystemError",
    "SystemExit", "TabError", "TimeoutError", "True", "TypeError", "UnboundLocalError",
    "UnicodeDecodeError", "UnicodeEncodeError", "UnicodeError", "UnicodeTranslateError",
    "UnicodeWarning", "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
    "__build_class__", "__debug__", "__doc__", "__import__", "__loader__", "__name__",
    "__package__", "__spec__",
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
    "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval",
    "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
    "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass",
    "iter", "len", "license", "list", "locals", "map", "max", "memoryview", "min", "next",
    "object", "oct", "open", "ord", "pow", "print", "property", "quit", "range", "repr",
    "reversed", "round", "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum",
    "super", "tuple", "type", "vars", "zip",
};

/// Modules whose import is reported as dangerous.
static DANGEROUS_MODULES: phf::Set<&'static str> = phf_set! {
    "pickle", "os", "subprocess",
};

/// Attributes that expose interpreter internals.
static SENSITIVE_ATTRIBUTES: phf::Set<&'static str> = phf_set! {
    "__dict__", "__class__", "__globals__",
};

/// Method names that spawn processes.
static SHELL_CALLS: phf::Set<&'static str> = phf_set! {
    "call", "Popen",
};

pub fn is_builtin(name: &str) -> bool {
    PYTHON_BUILTINS.contains(name)
}

pub fn is_dangerous_module(name: &str) -> bool {
    DANGEROUS_MODULES.contains(name)
}

pub fn is_sensitive_attribute(attr: &str) -> bool {
    SENSITIVE_ATTRIBUTES.contains(attr)
}

pub fn is_shell_call(method: &str) -> bool {
    SHELL_CALLS.contains(method)
}

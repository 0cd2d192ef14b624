// ABOUTME: Configuration and constants for the liss compiler and VM

#[allow(dead_code)]
pub const VERSION: &str = "1.0.0";

pub const WELCOME_MESSAGE: &str = "liss v1.0";
pub const WELCOME_SUBTITLE: &str = "A bytecode-compiled Lisp dialect. Ctrl-D exits.";

/// Prompt shown by the interactive REPL.
pub const PROMPT: &str = "liss> ";

/// REPL history file, stored in the working directory.
pub const HISTORY_FILE: &str = ".liss_history";

// ============================================================================
// VM capacities
// ============================================================================

/// Capacity of the value stack. Pushing past this is a stack overflow.
pub const STACK_SIZE: usize = 4096;

/// Capacity of the frame pool. Non-tail call depth is bounded by this.
pub const MAX_FRAMES: usize = 1024;

/// Globals are addressed with a 16-bit operand.
pub const MAX_GLOBALS: usize = 65536;

/// Locals are addressed with an 8-bit operand.
pub const MAX_LOCALS: usize = 256;

// ============================================================================
// Modules
// ============================================================================

/// Extension of liss source files.
pub const MODULE_EXT: &str = ".liss";

/// Directory of bundled modules, relative to the executable.
pub const STD_DIR: &str = "std";

//! The fixed policy catalog
//!
//! Entries are append-only: an id is never reused or removed, and a
//! default is never changed to anything but `OLD` or `WARN`.

use super::{Policy, PolicyId, PolicyStatus, Version};

/// Version reported by this interpreter (`CMAKE_VERSION`).
pub const TOOL_VERSION: Version = Version::new(3, 28, 0);

pub const CMP0002: PolicyId = PolicyId(2);
pub const CMP0004: PolicyId = PolicyId(4);
pub const CMP0010: PolicyId = PolicyId(10);
pub const CMP0011: PolicyId = PolicyId(11);
pub const CMP0012: PolicyId = PolicyId(12);
pub const CMP0054: PolicyId = PolicyId(54);
pub const CMP0055: PolicyId = PolicyId(55);
pub const CMP0057: PolicyId = PolicyId(57);
pub const CMP0124: PolicyId = PolicyId(124);
pub const CMP0126: PolicyId = PolicyId(126);
pub const CMP0140: PolicyId = PolicyId(140);

/// Every policy known to this interpreter, sorted by id.
pub static CATALOG: &[Policy] = &[
    Policy {
        id: CMP0002,
        description: "Logical target names must be globally unique.",
        old_behavior: "a target name may be reused in a different directory; the first declaration keeps the name",
        new_behavior: "declaring a target whose name is already taken anywhere in the project is an error",
        introduced: Version::new(2, 6, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0004,
        description: "Libraries linked may not have leading or trailing whitespace.",
        old_behavior: "whitespace around link items is stripped silently",
        new_behavior: "a link item with leading or trailing whitespace is an error",
        introduced: Version::new(2, 6, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0010,
        description: "Bad variable reference syntax is an error.",
        old_behavior: "an unterminated ${ reference is kept as literal text",
        new_behavior: "an unterminated ${ reference fails the invocation",
        introduced: Version::new(2, 6, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0011,
        description: "Included scripts do automatic cmake_policy PUSH and POP.",
        old_behavior: "policy settings made by an included file leak into the includer",
        new_behavior: "include() pushes a policy scope unless NO_POLICY_SCOPE is given",
        introduced: Version::new(2, 6, 3),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0012,
        description: "if() recognizes numbers and boolean constants.",
        old_behavior: "numbers and boolean constants are looked up as variable names first",
        new_behavior: "numbers and boolean constants are always evaluated as constants",
        introduced: Version::new(2, 8, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0054,
        description: "Only interpret if() arguments as variables or keywords when unquoted.",
        old_behavior: "quoted arguments are dereferenced as variables and recognized as keywords",
        new_behavior: "quoted and bracket arguments are plain strings inside if()",
        introduced: Version::new(3, 1, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0055,
        description: "Strict checking for break() command.",
        old_behavior: "break() outside of a loop, or with arguments, is silently ignored",
        new_behavior: "break() outside of a loop, or with arguments, is an error",
        introduced: Version::new(3, 2, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0057,
        description: "Support new if() IN_LIST operator.",
        old_behavior: "IN_LIST is not an operator and its use is an error",
        new_behavior: "IN_LIST tests whether a value is an element of a list variable",
        introduced: Version::new(3, 3, 0),
        default: PolicyStatus::Warn,
    },
    Policy {
        id: CMP0124,
        description: "foreach() loop variables are only available in the loop scope.",
        old_behavior: "after the loop the loop variable is left set to an empty string",
        new_behavior: "after the loop the loop variable is restored to its value before the loop, or unset",
        introduced: Version::new(3, 21, 0),
        default: PolicyStatus::Old,
    },
    Policy {
        id: CMP0126,
        description: "set(CACHE) does not remove a normal variable of the same name.",
        old_behavior: "setting a process-scope (cache) variable removes a normal binding of the same name in the current scope",
        new_behavior: "normal bindings are left untouched by set(CACHE)",
        introduced: Version::new(3, 21, 0),
        default: PolicyStatus::Old,
    },
    Policy {
        id: CMP0140,
        description: "The return() command checks its parameters.",
        old_behavior: "arguments to return() are ignored",
        new_behavior: "return() accepts only PROPAGATE <var>... and rejects anything else",
        introduced: Version::new(3, 25, 0),
        default: PolicyStatus::Warn,
    },
];

/// Find a policy by id.
pub fn lookup(id: PolicyId) -> Option<&'static Policy> {
    CATALOG
        .binary_search_by_key(&id, |p| p.id)
        .ok()
        .and_then(|idx| CATALOG.get(idx))
}

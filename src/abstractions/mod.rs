/*!

Types/type aliases that abstract over the implementing backing type, plus the logging facility.

*/

// Logging
pub mod log;

// Interned string, used for debug tag labels.
pub use string_cache::DefaultAtom as IString;

/// Execution classes used to tag spawned work in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Watches a remote completion handle and settles it when delivered.
	Completion,
	/// Background work that nobody waits on.
	Background,
}

impl TaskClass {
	/// Stable label used in trace fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Completion => "completion",
			Self::Background => "background",
		}
	}
}

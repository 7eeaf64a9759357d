/// Splits a command line on spaces into an argument vector.
///
/// Tokens are trimmed and empty ones dropped, so runs of whitespace collapse.
/// There is no quoting or escaping: `echo "a b"` yields `["echo", "\"a", "b\""]`.
pub fn tokenize(command: &str) -> Vec<String> {
	command
		.split(' ')
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.map(String::from)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_spaces() {
		assert_eq!(tokenize("echo  hello world"), vec!["echo", "hello", "world"]);
	}

	#[test]
	fn trims_and_drops_empty_tokens() {
		assert_eq!(tokenize("  ls   -la  "), vec!["ls", "-la"]);
	}

	#[test]
	fn empty_input_yields_nothing() {
		assert!(tokenize("").is_empty());
		assert!(tokenize("    ").is_empty());
	}

	#[test]
	fn tabs_are_trimmed_at_token_edges() {
		assert_eq!(tokenize("\tsleep 5\n"), vec!["sleep", "5"]);
	}

	#[test]
	fn quotes_are_not_interpreted() {
		assert_eq!(tokenize("echo \"a b\""), vec!["echo", "\"a", "b\""]);
	}
}

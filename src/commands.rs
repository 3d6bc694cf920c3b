/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home", "stats"],
    description: "Account overview",
  },
  Command {
    name: "payments",
    aliases: &["p", "pay", "history"],
    description: "Payment history",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Fetch fresh data now",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit taskboard",
  },
];

/// How well `input` matches `cmd`; lower is better, `None` is no match.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  let on_alias = |check: fn(&str, &str) -> bool| cmd.aliases.iter().any(|a| check(a, input));

  if cmd.name == input {
    Some(0)
  } else if on_alias(|a, i| a == i) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if on_alias(|a, i| a.starts_with(i)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if on_alias(|a, i| a.contains(i)) {
    Some(5)
  } else {
    None
  }
}

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(u32, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (rank, cmd)))
    .collect();
  matches.sort_by_key(|(rank, _)| *rank);

  matches.into_iter().map(|(_, cmd)| cmd).collect()
}

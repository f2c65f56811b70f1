//! REPL input parsing

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent as a message
    Send(String),
    New,
    Chats,
    /// Open a chat by its 1-based position in the list
    Open(usize),
    Delete(usize),
    Login {
        email: String,
        password: String,
    },
    Register {
        email: String,
        password: String,
        name: String,
    },
    Logout,
    WhoAmI,
    Help,
    Quit,
}

pub const HELP: &str = "\
/new                                 start a new chat
/chats                               list your chats
/open <n>                            open chat n
/delete <n>                          delete chat n
/login <email> <password>            sign in
/register <email> <password> <name>  create an account and sign in
/logout                              sign out
/whoami                              show the signed-in user
/help                                show this help
/quit                                exit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Send(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match (name, args.as_slice()) {
            ("new", []) => Ok(Command::New),
            ("chats", []) => Ok(Command::Chats),
            ("open", [n]) => parse_index(n).map(Command::Open),
            ("delete", [n]) => parse_index(n).map(Command::Delete),
            ("login", [email, password]) => Ok(Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }),
            ("register", [email, password, name @ ..]) if !name.is_empty() => {
                Ok(Command::Register {
                    email: email.to_string(),
                    password: password.to_string(),
                    name: name.join(" "),
                })
            }
            ("logout", []) => Ok(Command::Logout),
            ("whoami", []) => Ok(Command::WhoAmI),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", []) => Ok(Command::Quit),
            _ => Err(format!("unknown command: /{} (try /help)", rest)),
        }
    }
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a chat number, got '{}'", arg)),
    }
}

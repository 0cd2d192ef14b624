// ABOUTME: Regex engine: Thompson-construction NFA compiler and simulator

use std::fmt;

/// Character-class shorthands reachable through backslash escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    Digit,
    Word,
    Space,
}

impl ClassKind {
    fn matches(self, c: char) -> bool {
        match self {
            ClassKind::Digit => c.is_ascii_digit(),
            ClassKind::Word => c.is_alphanumeric() || c == '_',
            ClassKind::Space => c.is_whitespace(),
        }
    }
}

/// NFA program instructions. `Split` prefers its first target, which is what
/// makes repetition greedy and alternation leftmost-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inst {
    Char(char),
    Class { kind: ClassKind, negate: bool },
    Any,
    Split(usize, usize),
    Jmp(usize),
    Save(usize),
    AssertStart,
    AssertEnd,
    Match,
}

// ============================================================================
// Pattern parsing
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Empty,
    Char(char),
    Class { kind: ClassKind, negate: bool },
    Any,
    Start,
    End,
    Concat(Vec<Node>),
    Alt(Box<Node>, Box<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
    Quest(Box<Node>),
    Group(Box<Node>, usize),
}

struct PatternParser {
    chars: Vec<char>,
    pos: usize,
    groups: usize,
}

impl PatternParser {
    fn new(pattern: &str) -> Self {
        PatternParser {
            chars: pattern.chars().collect(),
            pos: 0,
            groups: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse_alt(&mut self) -> Result<Node, String> {
        let mut node = self.parse_concat()?;
        while self.peek() == Some('|') {
            self.pos += 1;
            let rhs = self.parse_concat()?;
            node = Node::Alt(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_concat(&mut self) -> Result<Node, String> {
        let mut parts = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.parse_atom()?;
            parts.push(self.parse_repeat(atom)?);
        }
        Ok(match parts.len() {
            0 => Node::Empty,
            1 => parts.into_iter().next().unwrap(),
            _ => Node::Concat(parts),
        })
    }

    fn parse_repeat(&mut self, atom: Node) -> Result<Node, String> {
        let mut node = atom;
        while let Some(c) = self.peek() {
            node = match c {
                '*' => Node::Star(Box::new(node)),
                '+' => Node::Plus(Box::new(node)),
                '?' => Node::Quest(Box::new(node)),
                _ => break,
            };
            self.pos += 1;
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Node, String> {
        let c = self.peek().ok_or("unexpected end of pattern")?;
        self.pos += 1;
        match c {
            '(' => {
                self.groups += 1;
                let group = self.groups;
                let inner = self.parse_alt()?;
                if self.peek() != Some(')') {
                    return Err("missing closing )".to_string());
                }
                self.pos += 1;
                Ok(Node::Group(Box::new(inner), group))
            }
            '.' => Ok(Node::Any),
            '^' => Ok(Node::Start),
            '$' => Ok(Node::End),
            '*' | '+' | '?' => Err(format!("nothing to repeat before {:?}", c)),
            '\\' => {
                let esc = self.peek().ok_or("trailing backslash")?;
                self.pos += 1;
                Ok(match esc {
                    'd' => Node::Class { kind: ClassKind::Digit, negate: false },
                    'D' => Node::Class { kind: ClassKind::Digit, negate: true },
                    'w' => Node::Class { kind: ClassKind::Word, negate: false },
                    'W' => Node::Class { kind: ClassKind::Word, negate: true },
                    's' => Node::Class { kind: ClassKind::Space, negate: false },
                    'S' => Node::Class { kind: ClassKind::Space, negate: true },
                    other => Node::Char(other),
                })
            }
            other => Ok(Node::Char(other)),
        }
    }
}

// ============================================================================
// Compiled regex
// ============================================================================

pub struct Regex {
    pub pattern: String,
    prog: Vec<Inst>,
    pub ngroups: usize,
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Regex({:?})", self.pattern)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Leftmost-first search anywhere in the subject.
    Search,
    /// The whole subject must match.
    Full,
}

type Saves = Vec<Option<usize>>;

#[derive(Clone)]
struct Thread {
    pc: usize,
    saves: Saves,
}

struct ThreadList {
    threads: Vec<Thread>,
    seen: Vec<bool>,
}

impl ThreadList {
    fn new(prog_len: usize) -> Self {
        ThreadList {
            threads: Vec::new(),
            seen: vec![false; prog_len],
        }
    }

    fn clear(&mut self) {
        self.threads.clear();
        self.seen.fill(false);
    }
}

impl Regex {
    pub fn compile(pattern: &str) -> Result<Regex, String> {
        let mut parser = PatternParser::new(pattern);
        let root = parser.parse_alt()?;
        if parser.peek() == Some(')') {
            return Err("unmatched )".to_string());
        }

        let mut prog = Vec::new();
        prog.push(Inst::Save(0));
        emit(&mut prog, &root);
        prog.push(Inst::Save(1));
        prog.push(Inst::Match);

        Ok(Regex {
            pattern: pattern.to_string(),
            prog,
            ngroups: parser.groups,
        })
    }

    /// True when the pattern matches the entire subject.
    pub fn is_full_match(&self, subject: &str) -> bool {
        self.exec(subject, Mode::Full).is_some()
    }

    /// Leftmost-first search. Returns per-group code-point spans; index 0 is
    /// the full match, groups that did not participate are None.
    pub fn captures(&self, subject: &str) -> Option<Vec<Option<(usize, usize)>>> {
        self.exec(subject, Mode::Search)
    }

    fn add_thread(&self, list: &mut ThreadList, pc: usize, pos: usize, len: usize, saves: Saves) {
        if list.seen[pc] {
            return;
        }
        list.seen[pc] = true;
        match self.prog[pc] {
            Inst::Jmp(target) => self.add_thread(list, target, pos, len, saves),
            Inst::Split(a, b) => {
                self.add_thread(list, a, pos, len, saves.clone());
                self.add_thread(list, b, pos, len, saves);
            }
            Inst::Save(slot) => {
                let mut saves = saves;
                saves[slot] = Some(pos);
                self.add_thread(list, pc + 1, pos, len, saves);
            }
            Inst::AssertStart => {
                if pos == 0 {
                    self.add_thread(list, pc + 1, pos, len, saves);
                }
            }
            Inst::AssertEnd => {
                if pos == len {
                    self.add_thread(list, pc + 1, pos, len, saves);
                }
            }
            _ => list.threads.push(Thread { pc, saves }),
        }
    }

    fn exec(&self, subject: &str, mode: Mode) -> Option<Vec<Option<(usize, usize)>>> {
        let chars: Vec<char> = subject.chars().collect();
        let len = chars.len();
        let nslots = 2 * (self.ngroups + 1);

        let mut clist = ThreadList::new(self.prog.len());
        let mut nlist = ThreadList::new(self.prog.len());
        let mut matched: Option<Saves> = None;

        for pos in 0..=len {
            // New start threads are seeded at the lowest priority, so an
            // earlier start always wins (leftmost-first).
            let seed = pos == 0 || (mode == Mode::Search && matched.is_none());
            if seed {
                self.add_thread(&mut clist, 0, pos, len, vec![None; nslots]);
            }

            let c = chars.get(pos).copied();
            let mut i = 0;
            while i < clist.threads.len() {
                let thread = clist.threads[i].clone();
                i += 1;
                match self.prog[thread.pc] {
                    Inst::Char(want) => {
                        if c == Some(want) {
                            self.add_thread(&mut nlist, thread.pc + 1, pos + 1, len, thread.saves);
                        }
                    }
                    Inst::Class { kind, negate } => {
                        if let Some(c) = c {
                            if kind.matches(c) != negate {
                                self.add_thread(
                                    &mut nlist,
                                    thread.pc + 1,
                                    pos + 1,
                                    len,
                                    thread.saves,
                                );
                            }
                        }
                    }
                    Inst::Any => {
                        if c.is_some() {
                            self.add_thread(&mut nlist, thread.pc + 1, pos + 1, len, thread.saves);
                        }
                    }
                    Inst::Match => {
                        if mode == Mode::Search || pos == len {
                            // Lower-priority threads are cut; higher-priority
                            // continuations in nlist may still improve this.
                            matched = Some(thread.saves);
                            break;
                        }
                    }
                    _ => unreachable!("epsilon instructions resolve in add_thread"),
                }
            }

            std::mem::swap(&mut clist, &mut nlist);
            nlist.clear();
            if clist.threads.is_empty() && (matched.is_some() || mode == Mode::Full) && pos < len {
                // No live thread can extend; in full mode this is a failure,
                // in search mode the recorded match stands.
                break;
            }
        }

        matched.map(|saves| {
            (0..=self.ngroups)
                .map(|g| match (saves[2 * g], saves[2 * g + 1]) {
                    (Some(a), Some(b)) => Some((a, b)),
                    _ => None,
                })
                .collect()
        })
    }
}

fn emit(prog: &mut Vec<Inst>, node: &Node) {
    match node {
        Node::Empty => {}
        Node::Char(c) => prog.push(Inst::Char(*c)),
        Node::Class { kind, negate } => prog.push(Inst::Class {
            kind: *kind,
            negate: *negate,
        }),
        Node::Any => prog.push(Inst::Any),
        Node::Start => prog.push(Inst::AssertStart),
        Node::End => prog.push(Inst::AssertEnd),
        Node::Concat(parts) => {
            for part in parts {
                emit(prog, part);
            }
        }
        Node::Alt(a, b) => {
            let split = prog.len();
            prog.push(Inst::Split(0, 0));
            emit(prog, a);
            let jmp = prog.len();
            prog.push(Inst::Jmp(0));
            let b_start = prog.len();
            emit(prog, b);
            prog[split] = Inst::Split(split + 1, b_start);
            prog[jmp] = Inst::Jmp(prog.len());
        }
        Node::Star(a) => {
            let split = prog.len();
            prog.push(Inst::Split(0, 0));
            emit(prog, a);
            prog.push(Inst::Jmp(split));
            prog[split] = Inst::Split(split + 1, prog.len());
        }
        Node::Plus(a) => {
            let start = prog.len();
            emit(prog, a);
            let split = prog.len();
            prog.push(Inst::Split(start, split + 1));
        }
        Node::Quest(a) => {
            let split = prog.len();
            prog.push(Inst::Split(0, 0));
            emit(prog, a);
            prog[split] = Inst::Split(split + 1, prog.len());
        }
        Node::Group(a, n) => {
            prog.push(Inst::Save(2 * n));
            emit(prog, a);
            prog.push(Inst::Save(2 * n + 1));
        }
    }
}

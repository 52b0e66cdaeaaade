//! Equation typesetting for terminal output.
//!
//! The course writes every equation in a LaTeX subset. A [`Typesetter`]
//! owns the symbol tables; they are built on the first [`Typesetter::acquire`]
//! and dropped when the last [`Lease`] goes away.
//!
//! Rendering never fails from the caller's point of view: input the renderer
//! does not understand comes back unchanged.
use crate::error::{LabError, LabResult};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

const SYMBOLS: &[(&str, &str)] = &[
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("Delta", "Δ"),
    ("epsilon", "ε"),
    ("eta", "η"),
    ("theta", "θ"),
    ("Theta", "Θ"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("pi", "π"),
    ("sigma", "σ"),
    ("Sigma", "Σ"),
    ("phi", "φ"),
    ("omega", "ω"),
    ("partial", "∂"),
    ("nabla", "∇"),
    ("cdot", "·"),
    ("times", "×"),
    ("approx", "≈"),
    ("leq", "≤"),
    ("geq", "≥"),
    ("neq", "≠"),
    ("to", "→"),
    ("rightarrow", "→"),
    ("leftarrow", "←"),
    ("infty", "∞"),
    ("in", "∈"),
    ("sum", "∑"),
    ("prod", "∏"),
    ("ldots", "…"),
    ("cdots", "⋯"),
    ("quad", "  "),
    ("qquad", "    "),
    ("left", ""),
    ("right", ""),
];

const MACROS: &[(&str, &str)] = &[
    ("RR", r"\mathbb{R}"),
    ("NN", r"\mathbb{N}"),
    ("ZZ", r"\mathbb{Z}"),
];

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' | '−' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'i' => 'ⁱ',
        'n' => 'ⁿ',
        'T' => 'ᵀ',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0'..='9' => char::from_u32(0x2080 + (c as u32 - '0' as u32))?,
        '+' => '₊',
        '-' | '−' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'x' => 'ₓ',
        _ => return None,
    })
}

fn blackboard(c: char) -> Option<char> {
    Some(match c {
        'R' => 'ℝ',
        'N' => 'ℕ',
        'Z' => 'ℤ',
        'Q' => 'ℚ',
        'C' => 'ℂ',
        _ => return None,
    })
}

/// Script text in Unicode if every character has a form, otherwise
/// `^(…)` / `_(…)`.
fn script(marker: char, body: &str, map: fn(char) -> Option<char>) -> String {
    body.chars()
        .map(map)
        .collect::<Option<String>>()
        .unwrap_or_else(|| format!("{marker}({body})"))
}

#[derive(Debug)]
struct Engine {
    symbols: HashMap<&'static str, &'static str>,
    macros: HashMap<&'static str, &'static str>,
}

impl Engine {
    fn load() -> Self {
        debug!(symbols = SYMBOLS.len(), macros = MACROS.len(), "typesetter loaded");
        Self {
            symbols: SYMBOLS.iter().copied().collect(),
            macros: MACROS.iter().copied().collect(),
        }
    }

    fn render(&self, source: &str) -> LabResult<String> {
        Parser {
            chars: source.chars().peekable(),
            engine: self,
        }
        .group(false)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        debug!("typesetter released");
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    engine: &'a Engine,
}

impl Parser<'_> {
    fn unbalanced() -> LabError {
        LabError::Unknown {
            kind: "equation",
            value: "unbalanced braces".into(),
        }
    }

    /// Render up to the matching `}` (when `braced`) or end of input.
    fn group(&mut self, braced: bool) -> LabResult<String> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '}' if braced => return Ok(out),
                '}' => return Err(Self::unbalanced()),
                '{' => out.push_str(&self.group(true)?),
                '\\' => out.push_str(&self.command()?),
                '^' => {
                    let body = self.argument()?;
                    out.push_str(&script('^', &body, superscript));
                }
                '_' => {
                    let body = self.argument()?;
                    out.push_str(&script('_', &body, subscript));
                }
                c => out.push(c),
            }
        }
        if braced {
            Err(Self::unbalanced())
        } else {
            Ok(out)
        }
    }

    fn argument(&mut self) -> LabResult<String> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
        match self.chars.next() {
            Some('{') => self.group(true),
            Some('\\') => self.command(),
            Some(c) => Ok(c.to_string()),
            None => Err(LabError::Unknown {
                kind: "equation",
                value: "missing argument".into(),
            }),
        }
    }

    fn command(&mut self) -> LabResult<String> {
        let mut name = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_alphabetic()) {
            name.push(c);
        }
        if name.is_empty() {
            return Ok(match self.chars.next() {
                Some(',' | ';' | ' ') => " ".into(),
                Some('!') => String::new(),
                Some('\\') => "\n".into(),
                Some(c) => c.to_string(),
                None => "\\".into(),
            });
        }

        match name.as_str() {
            "frac" => {
                let num = self.argument()?;
                let den = self.argument()?;
                Ok(format!("({num})/({den})"))
            }
            "sqrt" => Ok(format!("√({})", self.argument()?)),
            "mathbb" => {
                let body = self.argument()?;
                Ok(body.chars().map(|c| blackboard(c).unwrap_or(c)).collect())
            }
            "text" | "mathrm" | "mathbf" | "mathit" | "operatorname" => self.argument(),
            other => {
                if let Some(symbol) = self.engine.symbols.get(other) {
                    Ok((*symbol).to_string())
                } else if let Some(expansion) = self.engine.macros.get(other) {
                    self.engine.render(expansion)
                } else {
                    Err(LabError::Unknown {
                        kind: "command",
                        value: format!("\\{other}"),
                    })
                }
            }
        }
    }
}

/// Shared, lazily-loaded renderer.
#[derive(Debug)]
pub struct Typesetter {
    slot: Mutex<Weak<Engine>>,
    loads: AtomicUsize,
}

static GLOBAL: Typesetter = Typesetter::new();

impl Typesetter {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Weak::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Process-wide instance.
    pub fn global() -> &'static Typesetter {
        &GLOBAL
    }

    /// Hand out a lease, loading the tables if nobody holds one.
    pub fn acquire(&self) -> Lease {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(engine) = slot.upgrade() {
            return Lease { engine };
        }
        let engine = Arc::new(Engine::load());
        *slot = Arc::downgrade(&engine);
        self.loads.fetch_add(1, Ordering::Relaxed);
        Lease { engine }
    }

    pub fn is_loaded(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.strong_count() > 0
    }

    /// How many times the tables have been built.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl Default for Typesetter {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the renderer alive.
#[derive(Debug, Clone)]
pub struct Lease {
    engine: Arc<Engine>,
}

impl Lease {
    pub fn try_render(&self, source: &str) -> LabResult<String> {
        self.engine.render(source)
    }

    /// Render `source`, or return it verbatim if it cannot be rendered.
    pub fn render(&self, source: &str) -> String {
        self.try_render(source).unwrap_or_else(|err| {
            warn!(%err, source, "equation left as source");
            source.to_string()
        })
    }

    pub fn shares_engine_with(&self, other: &Lease) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

/// Render with a short-lived lease on the global typesetter.
pub fn render(source: &str) -> String {
    Typesetter::global().acquire().render(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_once_and_releases_with_last_lease() {
        let ts = Typesetter::new();
        assert!(!ts.is_loaded());
        let a = ts.acquire();
        let b = ts.acquire();
        assert!(a.shares_engine_with(&b));
        assert_eq!(ts.loads(), 1);
        drop(a);
        assert!(ts.is_loaded());
        drop(b);
        assert!(!ts.is_loaded());
        let _c = ts.acquire();
        assert_eq!(ts.loads(), 2);
    }

    #[test]
    fn renders_course_notation() {
        let lease = Typesetter::new().acquire();
        assert_eq!(
            lease.render(r"z^{(2)} = \theta_1 x + \theta_2"),
            "z⁽²⁾ = θ₁ x + θ₂"
        );
        assert_eq!(
            lease.render(r"\frac{\partial J}{\partial \theta_1}"),
            "(∂ J)/(∂ θ₁)"
        );
        assert_eq!(lease.render(r"J(\theta) = \frac{1}{2}(y - t)^2"), "J(θ) = (1)/(2)(y - t)²");
        assert_eq!(lease.render(r"x \in \RR"), "x ∈ ℝ");
    }

    #[test]
    fn unknown_input_falls_back_to_source() {
        let lease = Typesetter::new().acquire();
        assert_eq!(lease.render(r"\weird{x}"), r"\weird{x}");
        assert_eq!(lease.render("{open"), "{open");
        assert!(lease.try_render(r"\frac{1}").is_err());
    }

    #[test]
    fn unmappable_scripts_use_parentheses() {
        let lease = Typesetter::new().acquire();
        assert_eq!(lease.render("W_{hq}"), "W_(hq)");
        assert_eq!(lease.render("e^{-z}"), "e^(-z)");
        assert_eq!(lease.render("x^{-1}"), "x⁻¹");
    }
}

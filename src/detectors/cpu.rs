use super::Context;
use crate::rules::{Category, Field};
use crate::types::Cpu;
use crate::vocabulary::Vocabulary;

/// Architecture buckets over the platform comment, first bucket wins. `None`
/// reports the matched token itself.
pub(super) const ARCHITECTURES: &[(Option<&str>, &[&str])] = &[
    (Some("amd64"), &["amd64", "x64", "x86-64", "x86_64", "wow64", "win64"]),
    (Some("ia32"), &["ia32", "i386", "i486", "i586", "i686", "x86;"]),
    (Some("arm64"), &["aarch64", "arm64", "armv8", "armv8l", "arm_64"]),
    (Some("armhf"), &["armv6", "armv7", "armhf", "armht", "armn", "armfl", "armfp"]),
    (Some("arm"), &["windows ce", "windows mobile", "ce; ppc", "mobile; ppc"]),
    (Some("ppc"), &["ppc", "powerpc"]),
    (Some("sparc"), &["sun4"]),
    (None, &["avr32", "ia64", "68k", "armv", "atmel", "irix", "mips", "sparc", "pa-risc"]),
];

pub(super) fn detect(ctx: &Context<'_>) -> Cpu {
    let mut fields = ctx.match_rules(Category::Cpu, ctx.ua);
    let mut architecture = fields.take(Field::Architecture);
    if architecture.is_empty() {
        if let Some(first) = ctx.sections.first() {
            architecture = from_comment(first.comment, &ctx.vocab.architectures);
        }
    }
    Cpu { architecture }
}

fn from_comment(comment: &str, buckets: &Vocabulary<Option<&'static str>>) -> String {
    match buckets.find(comment) {
        Some(hit) => match hit.label {
            Some(arch) => arch.to_string(),
            None => hit.needle.to_ascii_lowercase(),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch(comment: &str) -> String {
        from_comment(comment, &Vocabulary::build(ARCHITECTURES).unwrap())
    }

    #[test]
    fn buckets_in_priority_order() {
        assert_eq!(arch("Windows NT 10.0; Win64; x64"), "amd64");
        assert_eq!(arch("X11; Linux i686"), "ia32");
        assert_eq!(arch("X11; Linux aarch64"), "arm64");
        assert_eq!(arch("Linux; Android 4.4; armv7l"), "armhf");
        assert_eq!(arch("compatible; MSIE 6.0; Windows CE; PPC; 240x320"), "arm");
        assert_eq!(arch("Macintosh; U; PPC Mac OS X"), "ppc");
        assert_eq!(arch("X11; SunOS sun4u"), "sparc");
    }

    #[test]
    fn other_reports_the_token() {
        assert_eq!(arch("X11; IRIX 6.5 IP32"), "irix");
        assert_eq!(arch("Linux MIPS"), "mips");
    }

    #[test]
    fn nothing_recognised() {
        assert_eq!(arch("iPhone; CPU iPhone OS 17_2 like Mac OS X"), "");
        assert_eq!(arch(""), "");
    }
}

//! Stat, icon and gemstone tag tables
//!
//! `%%NAME%%` tags that are not colors or formats resolve against these
//! tables and expand in place to pre-formatted markup, which the parser
//! re-scans. Each expansion ends with a caller-supplied restore sequence so
//! the surrounding color and style resume afterwards.

use crate::chat::ChatColor;

/// How a stat tag expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatMode {
    /// `%%COLOR%%<extra><display>`
    Normal,
    /// Amount in the secondary color, stat display in the primary:
    /// `%%SUB%%<extra>%%COLOR%%<display>`. Falls back to `Normal` when no
    /// amount was given.
    Dual,
    /// `%%COLOR%%<display> <extra>` (`%%RED%%❣ Requires <extra>` footers).
    Post,
    /// `%%COLOR%%<display> %%SUB%%<extra>` (`Mana Cost: <amount>` lines).
    PostDual,
    /// `%%GRAY%%<name>: %%SUB%%<amount>` from `extra = "name:amount"`.
    ItemStat,
    /// Bold asterisks around the display: `* Co-op Soulbound *`.
    Soulbound,
    /// `%%COLOR%%<display>: <name> %%SUB%%%%BOLD%%<type>` from
    /// `extra = "name:type"`.
    Ability,
    /// Icon glyph bolded, the rest of the display plain.
    BoldIcon,
}

struct StatDef {
    name: &'static str,
    display: &'static str,
    color: ChatColor,
    sub_color: Option<ChatColor>,
    mode: StatMode,
}

const fn stat(name: &'static str, display: &'static str, color: ChatColor) -> StatDef {
    StatDef { name, display, color, sub_color: None, mode: StatMode::Normal }
}

const fn dual(
    name: &'static str,
    display: &'static str,
    color: ChatColor,
    sub: ChatColor,
) -> StatDef {
    StatDef { name, display, color, sub_color: Some(sub), mode: StatMode::Dual }
}

const STATS: &[StatDef] = &[
    stat("STRENGTH", "❁ Strength", ChatColor::Red),
    stat("DAMAGE", "❁ Damage", ChatColor::Red),
    dual("HEALTH", "❤ Health", ChatColor::Red, ChatColor::Green),
    stat("DEFENSE", "❈ Defense", ChatColor::Green),
    stat("TRUE_DEFENSE", "❂ True Defense", ChatColor::White),
    dual("SPEED", "✦ Speed", ChatColor::White, ChatColor::Green),
    stat("INTELLIGENCE", "✎ Intelligence", ChatColor::Aqua),
    stat("CRIT_CHANCE", "☣ Critical Chance", ChatColor::Blue),
    stat("CRIT_DAMAGE", "☠ Critical Damage", ChatColor::Blue),
    dual("ATTACK_SPEED", "⚔ Bonus Attack Speed", ChatColor::Yellow, ChatColor::Green),
    stat("FEROCITY", "⫽ Ferocity", ChatColor::Red),
    stat("MENDING", "☄ Mending", ChatColor::Green),
    stat("VITALITY", "♨ Vitality", ChatColor::DarkRed),
    stat("HEALTH_REGEN", "❣ Health Regen", ChatColor::Red),
    stat("MAGIC_FIND", "✯ Magic Find", ChatColor::Aqua),
    dual("PET_LUCK", "♣ Pet Luck", ChatColor::LightPurple, ChatColor::White),
    StatDef {
        name: "SEA_CREATURE_CHANCE",
        display: "α Sea Creature Chance",
        color: ChatColor::DarkAqua,
        sub_color: None,
        mode: StatMode::BoldIcon,
    },
    stat("FISHING_SPEED", "☂ Fishing Speed", ChatColor::Aqua),
    stat("ABILITY_DAMAGE", "๑ Ability Damage", ChatColor::Red),
    stat("MINING_SPEED", "⸕ Mining Speed", ChatColor::Gold),
    stat("BREAKING_POWER", "Ⓟ Breaking Power", ChatColor::DarkGreen),
    stat("PRISTINE", "✧ Pristine", ChatColor::DarkPurple),
    stat("MINING_FORTUNE", "☘ Mining Fortune", ChatColor::Gold),
    stat("FARMING_FORTUNE", "☘ Farming Fortune", ChatColor::Gold),
    stat("FORAGING_FORTUNE", "☘ Foraging Fortune", ChatColor::Gold),
    stat("SOULFLOW", "⸎ Soulflow", ChatColor::DarkAqua),
    stat("OVERFLOW_MANA", "ʬ Overflow Mana", ChatColor::DarkAqua),
    stat("SWING_RANGE", "Ⓢ Swing Range", ChatColor::Yellow),
    stat("FUEL", "♢ Fuel", ChatColor::DarkGreen),
    stat("MITHRIL_POWDER", "᠅ Mithril Powder", ChatColor::DarkGreen),
    stat("GEMSTONE_POWDER", "᠅ Gemstone Powder", ChatColor::LightPurple),
    stat("COMBAT_WISDOM", "☯ Combat Wisdom", ChatColor::DarkAqua),
    stat("MINING_WISDOM", "☯ Mining Wisdom", ChatColor::DarkAqua),
    stat("FARMING_WISDOM", "☯ Farming Wisdom", ChatColor::DarkAqua),
    stat("FORAGING_WISDOM", "☯ Foraging Wisdom", ChatColor::DarkAqua),
    stat("FISHING_WISDOM", "☯ Fishing Wisdom", ChatColor::DarkAqua),
    stat("ENCHANTING_WISDOM", "☯ Enchanting Wisdom", ChatColor::DarkAqua),
    stat("ALCHEMY_WISDOM", "☯ Alchemy Wisdom", ChatColor::DarkAqua),
    stat("CARPENTRY_WISDOM", "☯ Carpentry Wisdom", ChatColor::DarkAqua),
    stat("TAMING_WISDOM", "☯ Taming Wisdom", ChatColor::DarkAqua),
    stat("RUNECRAFTING_WISDOM", "☯ Runecrafting Wisdom", ChatColor::DarkAqua),
    stat("SOCIAL_WISDOM", "☯ Social Wisdom", ChatColor::DarkAqua),
    stat("RIFT_TIME", "ф Rift Time", ChatColor::Green),
    stat("RIFT_DAMAGE", "❁ Rift Damage", ChatColor::DarkPurple),
    stat("MANA_REGEN", "⚡ Mana Regen", ChatColor::Aqua),
    stat("RIFT_TRANSFERABLE", "Rift-Transferable", ChatColor::DarkPurple),
    stat("UNDEAD", "༕ This armor piece is undead ༕!", ChatColor::DarkGreen),
    stat("RECIPE", "Right-click to view recipes!", ChatColor::Yellow),
    StatDef {
        name: "COOP_SOULBOUND",
        display: "Co-op Soulbound",
        color: ChatColor::DarkGray,
        sub_color: None,
        mode: StatMode::Soulbound,
    },
    StatDef {
        name: "SOULBOUND",
        display: "Soulbound",
        color: ChatColor::DarkGray,
        sub_color: None,
        mode: StatMode::Soulbound,
    },
    StatDef {
        name: "MANA_COST",
        display: "Mana Cost:",
        color: ChatColor::DarkGray,
        sub_color: Some(ChatColor::DarkAqua),
        mode: StatMode::PostDual,
    },
    StatDef {
        name: "COOLDOWN",
        display: "Cooldown:",
        color: ChatColor::DarkGray,
        sub_color: Some(ChatColor::Green),
        mode: StatMode::PostDual,
    },
    StatDef {
        name: "ABILITY",
        display: "Ability",
        color: ChatColor::Gold,
        sub_color: Some(ChatColor::Yellow),
        mode: StatMode::Ability,
    },
    StatDef {
        name: "REQUIRE",
        display: "❣ Requires",
        color: ChatColor::Red,
        sub_color: None,
        mode: StatMode::Post,
    },
    stat("REFORGABLE", "This item can be reforged!", ChatColor::DarkGray),
    StatDef {
        name: "ITEM_STAT_RED",
        display: "ITEM_STAT_RED",
        color: ChatColor::Gray,
        sub_color: Some(ChatColor::Red),
        mode: StatMode::ItemStat,
    },
    StatDef {
        name: "ITEM_STAT_GREEN",
        display: "ITEM_STAT_GREEN",
        color: ChatColor::Gray,
        sub_color: Some(ChatColor::Green),
        mode: StatMode::ItemStat,
    },
    StatDef {
        name: "ITEM_STAT_PURPLE",
        display: "ITEM_STAT_PINK",
        color: ChatColor::Gray,
        sub_color: Some(ChatColor::LightPurple),
        mode: StatMode::ItemStat,
    },
];

/// Icons whose `extraData` is a repeat count.
const REPEATING_ICONS: &[&str] = &["TICKER", "ZOMBIE_CHARGE", "STAR"];

const ICONS: &[(&str, &str)] = &[
    ("DOT", "•"),
    ("TICKER", "Ⓞ"),
    ("ZOMBIE_CHARGE", "ⓩ"),
    ("STAR", "✪"),
    ("STARRED", "⚚"),
    ("FRAGGED", "⚚"),
    ("BINGO", "Ⓑ"),
    ("ZONE", "⏣"),
    ("ABIPHONE", "✆"),
    ("CHECKMARK", "✔"),
    ("CROSS", "✖"),
    ("RAFFLE", "⛃"),
    ("SWEEP_BOOSTER", "ꕮ"),
    ("LUCK_BOOSTER", "ꆤ"),
    ("FIGHTING_BOOSTER", "४"),
    ("FORAGING_WISDOM_BOOSTER", "⸙"),
    ("FORAGING_FORTUNE_BOOSTER", "⎋"),
];

const GEMSTONES: &[(&str, &str)] = &[
    ("RUBY", "❤"),
    ("AMETHYST", "❈"),
    ("JASPER", "❁"),
    ("SAPPHIRE", "✎"),
    ("AMBER", "⸕"),
    ("TOPAZ", "✧"),
    ("JADE", "☘"),
    ("OPAL", "❂"),
];

/// Expand a stat tag. `icon_only` (the `&` prefix form) drops the stat
/// display text and keeps just the icon glyph.
pub fn expand_stat(name: &str, extra: &str, icon_only: bool) -> Option<String> {
    let def = STATS.iter().find(|s| s.name.eq_ignore_ascii_case(name))?;

    let color = def.color.name();
    let sub = def.sub_color.unwrap_or(def.color).name();
    let display = if icon_only {
        def.display.split_whitespace().next().unwrap_or(def.display)
    } else {
        def.display
    };

    let expanded = match def.mode {
        StatMode::Normal => format!("%%{color}%%{extra}{display}"),
        StatMode::Dual if extra.is_empty() => format!("%%{color}%%{display}"),
        StatMode::Dual => format!("%%{sub}%%{extra}%%{color}%%{display}"),
        StatMode::Post => format!("%%{color}%%{display} {extra}"),
        StatMode::PostDual => format!("%%{color}%%{display} %%{sub}%%{extra}"),
        StatMode::ItemStat => {
            let Some((label, amount)) = extra.split_once(':') else {
                return Some("ITEM_STAT_MISSING_SEPARATOR".to_string());
            };
            format!("%%{color}%%{label}: %%{sub}%%{amount}")
        }
        StatMode::Soulbound => {
            format!("%%{color}%%%%BOLD%%* %%{color}%%{display} %%BOLD%%*")
        }
        StatMode::Ability => {
            if extra.is_empty() {
                return Some("ABILITY_MISSING_DETAILS".to_string());
            }
            let Some((ability, kind)) = extra.split_once(':') else {
                return Some("ABILITY_MISSING_SEPARATOR".to_string());
            };
            format!("%%{color}%%{display}: {ability} %%{sub}%%%%BOLD%%{kind}")
        }
        StatMode::BoldIcon => {
            // Icon glyph bolded in place, the stat text plain after it
            let (icon, rest) = def.display.split_once(' ').unwrap_or((def.display, ""));
            format!("%%{color}%%{extra}%%BOLD%%{icon}%%{color}%% {rest}")
        }
    };

    Some(expanded)
}

/// Expand an icon tag. Repeating icons interpret `extra` as a count.
pub fn expand_icon(name: &str, extra: &str) -> Option<String> {
    let (_, glyph) = ICONS.iter().find(|(n, _)| n.eq_ignore_ascii_case(name))?;

    if REPEATING_ICONS.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        let count = extra.trim().parse::<usize>().unwrap_or(1).min(64);
        return Some(glyph.repeat(count));
    }

    Some((*glyph).to_string())
}

/// Expand a gemstone tag to its bracketed dark-gray icon form.
pub fn expand_gemstone(name: &str) -> Option<String> {
    let (_, glyph) = GEMSTONES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name))?;
    Some(format!("%%DARK_GRAY%%[{}]", glyph))
}

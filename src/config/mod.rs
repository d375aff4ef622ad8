mod settings;

pub use settings::{
    default_xp_table, parse_id_list, ClanSettings, CommandRoles, EconomySettings, LoveSettings,
    Settings, TicketSettings,
};

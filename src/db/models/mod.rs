mod account;
mod active_mute;
mod clan;
mod couple;
mod custom_role;
mod punishment;
mod shop_item;
mod ticket;

pub use account::{Account, Cooldown, VoicePresence};
pub use active_mute::ActiveMute;
pub use clan::{Clan, ClanMember, ClanRole};
pub use couple::{ActiveSession, Couple, LoveRoomAccess, VoiceSessionLog};
pub use custom_role::{
    CustomRoleRequest, MarketItem, MarketKind, OwnedCustomRole, RequestStatus, RoleEditRequest,
    RoleListing,
};
pub use punishment::{DisciplineSummary, PunishmentKind, PunishmentRecord};
pub use shop_item::{ShopItem, TempRole};
pub use ticket::{Ticket, TicketStatus};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use socketioxide::SocketIo;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::enums::InquiryStatus;
use crate::models::{Dealer, Inquiry, Listing, NewInquiry};
use crate::schema::{inquiries, listings};
use crate::services::{dealer_service, notification_service};

/// Which participant of a thread is acting. Each side may only touch its own
/// archive/read flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSide {
    Buyer,
    Dealer,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InquiryFilter {
    #[default]
    All,
    Archived,
    Unread,
}

#[derive(Debug)]
pub struct SubmitInquiry {
    pub listing_id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

/// Inquiry enriched with the listing preview fields the thread UIs render.
#[derive(Debug, Serialize)]
pub struct InquiryWithListing {
    #[serde(flatten)]
    pub inquiry: Inquiry,
    pub listing_title: String,
    pub listing_price_cents: i64,
    pub listing_photo_url: Option<String>,
}

/// Effect of an inbound buyer message on a thread: merge into the open row
/// or create one, and move the listing counter only on first contact. Either
/// way the conversation resets to NEW.
#[derive(Debug, PartialEq, Eq)]
pub struct MessageEffect {
    pub merge: bool,
    pub increment_counter: bool,
    pub next_status: InquiryStatus,
}

pub fn message_effect(open_thread: Option<&Inquiry>) -> MessageEffect {
    MessageEffect {
        merge: open_thread.is_some(),
        increment_counter: open_thread.is_none(),
        next_status: InquiryStatus::New,
    }
}

/// What a dealer status update does to the row. ARCHIVED is not a transition
/// of the conversation chain; it only flips the dealer-side archive flag.
#[derive(Debug, PartialEq, Eq)]
pub enum DealerAction {
    ArchiveOnly,
    Transition(InquiryStatus),
}

pub fn dealer_action(new_status: InquiryStatus) -> DealerAction {
    if new_status == InquiryStatus::Archived {
        DealerAction::ArchiveOnly
    } else {
        DealerAction::Transition(new_status)
    }
}

/// Per-side view predicate over the archive flags and read timestamps. The
/// same thread can be archived for one side and live for the other.
pub fn visible_with(inquiry: &Inquiry, side: ThreadSide, filter: InquiryFilter) -> bool {
    let (archived, read_at) = match side {
        ThreadSide::Buyer => (inquiry.user_archived, inquiry.user_read_at),
        ThreadSide::Dealer => (inquiry.dealer_archived, inquiry.dealer_read_at),
    };

    match filter {
        InquiryFilter::All => !archived,
        InquiryFilter::Archived => archived,
        InquiryFilter::Unread => !archived && read_at.is_none(),
    }
}

/// Renders the separator line inserted between appended thread entries.
pub fn timestamp_marker(at: DateTime<Utc>) -> String {
    format!("--- {} ---", at.format("%d/%m/%Y, %H:%M:%S"))
}

/// Append a new entry to a delimited conversation log. The first entry is
/// stored bare; every later one is preceded by a timestamp marker.
pub fn append_entry(log: Option<&str>, text: &str, at: DateTime<Utc>) -> String {
    match log {
        Some(existing) if !existing.is_empty() => {
            format!("{existing}\n\n{}\n{text}", timestamp_marker(at))
        }
        _ => text.to_string(),
    }
}

fn with_listing(inquiry: Inquiry, listing: &Listing) -> InquiryWithListing {
    InquiryWithListing {
        inquiry,
        listing_title: listing.title.clone(),
        listing_price_cents: listing.price_cents,
        listing_photo_url: listing.primary_photo_url.clone(),
    }
}

/// Find the open thread for a (listing, dealer, buyer) tuple.
///
/// Guest inquiries (no user id) and registered inquiries are distinct threads
/// even for the same email. Rows carrying the legacy ARCHIVED status are
/// skipped so a new thread starts instead of resurrecting them.
fn find_open_thread(
    conn: &mut PgConnection,
    listing_id: Uuid,
    dealer_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<Option<Inquiry>> {
    let mut query = inquiries::table
        .filter(inquiries::listing_id.eq(listing_id))
        .filter(inquiries::dealer_id.eq(dealer_id))
        .filter(inquiries::status.ne(InquiryStatus::Archived))
        .order(inquiries::created_at.desc())
        .into_boxed();

    query = match user_id {
        Some(uid) => query.filter(inquiries::user_id.eq(uid)),
        None => query.filter(inquiries::user_id.is_null()),
    };

    Ok(query.first::<Inquiry>(conn).optional()?)
}

/// Submit a buyer message: merge into the open thread for the tuple, or open
/// a new one. The listing's inquiry counter only moves on first contact.
pub fn submit_message(
    conn: &mut PgConnection,
    io: &SocketIo,
    req: SubmitInquiry,
) -> AppResult<InquiryWithListing> {
    let listing: Listing = listings::table
        .find(req.listing_id)
        .first::<Listing>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ListingNotFound, "listing not found"))?;

    let dealer_id = req
        .dealer_id
        .or(listing.dealer_id)
        .ok_or_else(|| AppError::new(ErrorCode::DealerNotFound, "listing has no dealer"))?;
    let dealer = dealer_service::get_dealer(conn, dealer_id)?;

    let existing = find_open_thread(conn, listing.id, dealer.id, req.user_id)?;
    let effect = message_effect(existing.as_ref());
    let now = Utc::now();

    let inquiry: Inquiry = match existing {
        Some(thread) => {
            // Merge: grow the log, surface the thread as unread again for the
            // dealer.
            diesel::update(inquiries::table.find(thread.id))
                .set((
                    inquiries::message.eq(append_entry(Some(&thread.message), &req.message, now)),
                    inquiries::status.eq(effect.next_status),
                    inquiries::dealer_read_at.eq(None::<DateTime<Utc>>),
                    inquiries::updated_at.eq(now),
                ))
                .get_result(conn)?
        }
        None => diesel::insert_into(inquiries::table)
            .values(&NewInquiry {
                listing_id: listing.id,
                dealer_id: dealer.id,
                user_id: req.user_id,
                name: req.name.clone(),
                email: req.email.clone(),
                phone: req.phone.clone(),
                message: req.message.clone(),
                status: effect.next_status,
            })
            .get_result(conn)?,
    };

    // The counter is reserved for first contact.
    if effect.increment_counter {
        diesel::update(listings::table.find(listing.id))
            .set(listings::inquiry_count.eq(listings::inquiry_count + 1))
            .execute(conn)?;
    }

    let (title, body) = if effect.merge {
        (
            "New message on an inquiry".to_string(),
            format!("{} sent another message about \"{}\"", req.name, listing.title),
        )
    } else {
        (
            "New inquiry".to_string(),
            format!("{} is interested in \"{}\"", req.name, listing.title),
        )
    };

    // Dealer-side alert; its failure must not undo the saved inquiry.
    if let Err(e) = notification_service::notify(
        conn,
        io,
        dealer.user_id,
        "INQUIRY",
        &title,
        &body,
        Some(serde_json::json!({ "inquiry_id": inquiry.id, "listing_id": listing.id })),
        "new_inquiry",
    ) {
        tracing::error!(error = %e, inquiry_id = %inquiry.id, "failed to notify dealer of inquiry");
    }

    Ok(with_listing(inquiry, &listing))
}

/// Buyer sends another message on an existing thread. Routed through
/// [`submit_message`] so the merge/counter/notification semantics stay
/// identical to a fresh listing-page inquiry.
pub fn buyer_followup(
    conn: &mut PgConnection,
    io: &SocketIo,
    inquiry_id: Uuid,
    user_id: Uuid,
    message: String,
) -> AppResult<InquiryWithListing> {
    let inquiry = get_inquiry(conn, inquiry_id)?;
    require_buyer_side(&inquiry, user_id)?;

    submit_message(conn, io, SubmitInquiry {
        listing_id: inquiry.listing_id,
        dealer_id: Some(inquiry.dealer_id),
        user_id: Some(user_id),
        name: inquiry.name,
        email: inquiry.email,
        phone: inquiry.phone,
        message,
    })
}

fn get_inquiry(conn: &mut PgConnection, inquiry_id: Uuid) -> AppResult<Inquiry> {
    inquiries::table
        .find(inquiry_id)
        .first::<Inquiry>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InquiryNotFound, "inquiry not found"))
}

fn require_dealer_side(inquiry: &Inquiry, dealer: &Dealer) -> AppResult<()> {
    if inquiry.dealer_id != dealer.id {
        return Err(AppError::new(
            ErrorCode::NotInquiryOwner,
            "inquiry does not belong to this dealer",
        ));
    }
    Ok(())
}

fn require_buyer_side(inquiry: &Inquiry, user_id: Uuid) -> AppResult<()> {
    if inquiry.user_id != Some(user_id) {
        return Err(AppError::new(
            ErrorCode::NotInquiryOwner,
            "inquiry does not belong to this user",
        ));
    }
    Ok(())
}

/// Dealer reply/status update. Never creates a row; ARCHIVED only flips the
/// dealer-side archive flag and leaves the conversation status untouched.
pub fn dealer_update(
    conn: &mut PgConnection,
    io: &SocketIo,
    inquiry_id: Uuid,
    dealer: &Dealer,
    new_status: InquiryStatus,
    reply_text: Option<&str>,
) -> AppResult<Inquiry> {
    let inquiry = get_inquiry(conn, inquiry_id)?;
    require_dealer_side(&inquiry, dealer)?;

    let now = Utc::now();

    let mut inquiry: Inquiry = match dealer_action(new_status) {
        DealerAction::ArchiveOnly => diesel::update(inquiries::table.find(inquiry.id))
            .set((
                inquiries::dealer_archived.eq(true),
                inquiries::updated_at.eq(now),
            ))
            .get_result(conn)?,
        DealerAction::Transition(status) => diesel::update(inquiries::table.find(inquiry.id))
            .set((
                inquiries::status.eq(status),
                inquiries::is_read.eq(true),
                inquiries::read_at.eq(now),
                inquiries::updated_at.eq(now),
            ))
            .get_result(conn)?,
    };

    if let Some(text) = reply_text {
        inquiry = diesel::update(inquiries::table.find(inquiry.id))
            .set((
                inquiries::reply.eq(append_entry(inquiry.reply.as_deref(), text, now)),
                inquiries::replied_at.eq(now),
                inquiries::updated_at.eq(now),
            ))
            .get_result(conn)?;

        if let Some(buyer_id) = inquiry.user_id {
            if let Err(e) = notification_service::notify(
                conn,
                io,
                buyer_id,
                "INQUIRY_REPLY",
                "Dealer replied to your inquiry",
                &format!("{} replied to your inquiry", dealer.name),
                Some(serde_json::json!({ "inquiry_id": inquiry.id, "listing_id": inquiry.listing_id })),
                "inquiry_reply",
            ) {
                tracing::error!(error = %e, inquiry_id = %inquiry.id, "failed to notify buyer of reply");
            }
        }
    }

    Ok(inquiry)
}

/// Soft-delete a thread from one side only; the other side's view is
/// unaffected.
pub fn archive(
    conn: &mut PgConnection,
    inquiry_id: Uuid,
    side: ThreadSide,
    actor_user_id: Uuid,
) -> AppResult<Inquiry> {
    let inquiry = get_inquiry(conn, inquiry_id)?;
    let now = Utc::now();

    match side {
        ThreadSide::Buyer => {
            require_buyer_side(&inquiry, actor_user_id)?;
            Ok(diesel::update(inquiries::table.find(inquiry.id))
                .set((
                    inquiries::user_archived.eq(true),
                    inquiries::updated_at.eq(now),
                ))
                .get_result(conn)?)
        }
        ThreadSide::Dealer => {
            let dealer = dealer_service::dealer_for_user(conn, actor_user_id)?;
            require_dealer_side(&inquiry, &dealer)?;
            Ok(diesel::update(inquiries::table.find(inquiry.id))
                .set((
                    inquiries::dealer_archived.eq(true),
                    inquiries::updated_at.eq(now),
                ))
                .get_result(conn)?)
        }
    }
}

/// Mark a thread read from one side. Idempotent: a second read from the same
/// side is a no-op and emits nothing. On first read the *other* side's user
/// gets a `message_read` event so read receipts can render.
pub fn mark_read(
    conn: &mut PgConnection,
    io: &SocketIo,
    inquiry_id: Uuid,
    side: ThreadSide,
    actor_user_id: Uuid,
) -> AppResult<Inquiry> {
    let inquiry = get_inquiry(conn, inquiry_id)?;
    let now = Utc::now();

    match side {
        ThreadSide::Buyer => {
            require_buyer_side(&inquiry, actor_user_id)?;
            if inquiry.user_read_at.is_some() {
                return Ok(inquiry);
            }
            let updated: Inquiry = diesel::update(inquiries::table.find(inquiry.id))
                .set((
                    inquiries::user_read_at.eq(now),
                    inquiries::updated_at.eq(now),
                ))
                .get_result(conn)?;

            let dealer = dealer_service::get_dealer(conn, updated.dealer_id)?;
            notification_service::push(
                io,
                dealer.user_id,
                "message_read",
                &serde_json::json!({ "inquiry_id": updated.id, "read_by": "user", "read_at": now }),
            );
            Ok(updated)
        }
        ThreadSide::Dealer => {
            let dealer = dealer_service::dealer_for_user(conn, actor_user_id)?;
            require_dealer_side(&inquiry, &dealer)?;
            if inquiry.dealer_read_at.is_some() {
                return Ok(inquiry);
            }
            let updated: Inquiry = diesel::update(inquiries::table.find(inquiry.id))
                .set((
                    inquiries::dealer_read_at.eq(now),
                    inquiries::updated_at.eq(now),
                ))
                .get_result(conn)?;

            if let Some(buyer_id) = updated.user_id {
                notification_service::push(
                    io,
                    buyer_id,
                    "message_read",
                    &serde_json::json!({ "inquiry_id": updated.id, "read_by": "dealer", "read_at": now }),
                );
            }
            Ok(updated)
        }
    }
}

/// List a buyer's threads. Default and `all` exclude rows the buyer archived;
/// `archived` shows only those. A thread archived by the dealer alone still
/// shows up here.
pub fn list_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    filter: InquiryFilter,
) -> AppResult<Vec<Inquiry>> {
    let rows = inquiries::table
        .filter(inquiries::user_id.eq(user_id))
        .order(inquiries::updated_at.desc())
        .load::<Inquiry>(conn)?;

    Ok(rows
        .into_iter()
        .filter(|i| visible_with(i, ThreadSide::Buyer, filter))
        .collect())
}

/// Dealer-side counterpart of [`list_for_user`], keyed on the dealer flags.
pub fn list_for_dealer(
    conn: &mut PgConnection,
    dealer_id: Uuid,
    filter: InquiryFilter,
) -> AppResult<Vec<Inquiry>> {
    let rows = inquiries::table
        .filter(inquiries::dealer_id.eq(dealer_id))
        .order(inquiries::updated_at.desc())
        .load::<Inquiry>(conn)?;

    Ok(rows
        .into_iter()
        .filter(|i| visible_with(i, ThreadSide::Dealer, filter))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn first_entry_is_stored_bare() {
        assert_eq!(append_entry(None, "interested", at()), "interested");
        assert_eq!(append_entry(Some(""), "interested", at()), "interested");
    }

    #[test]
    fn later_entries_get_a_timestamp_marker() {
        let log = append_entry(None, "interested", at());
        let log = append_entry(Some(&log), "ok will do", at());

        assert_eq!(log, "interested\n\n--- 14/03/2026, 15:09:26 ---\nok will do");
        assert!(log.contains("interested"));
        assert!(log.contains("ok will do"));
    }

    #[test]
    fn marker_renders_seconds() {
        assert_eq!(timestamp_marker(at()), "--- 14/03/2026, 15:09:26 ---");
    }

    #[test]
    fn merging_is_repeatable() {
        let mut log = append_entry(None, "one", at());
        for text in ["two", "three", "four"] {
            log = append_entry(Some(&log), text, at());
        }
        // One marker per appended entry, none before the first.
        assert_eq!(log.matches("---").count() / 2, 3);
    }

    fn thread() -> Inquiry {
        Inquiry {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            dealer_id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            message: "interested".to_string(),
            reply: None,
            status: InquiryStatus::New,
            user_archived: false,
            dealer_archived: false,
            user_read_at: None,
            dealer_read_at: None,
            is_read: false,
            read_at: None,
            replied_at: None,
            created_at: at(),
            updated_at: at(),
        }
    }

    #[test]
    fn archiving_one_side_leaves_the_other_visible() {
        let mut inquiry = thread();
        inquiry.dealer_archived = true;

        assert!(!visible_with(&inquiry, ThreadSide::Dealer, InquiryFilter::All));
        assert!(visible_with(&inquiry, ThreadSide::Dealer, InquiryFilter::Archived));
        assert!(visible_with(&inquiry, ThreadSide::Buyer, InquiryFilter::All));
        assert!(!visible_with(&inquiry, ThreadSide::Buyer, InquiryFilter::Archived));
    }

    #[test]
    fn unread_filter_requires_no_side_read_timestamp() {
        let mut inquiry = thread();
        assert!(visible_with(&inquiry, ThreadSide::Buyer, InquiryFilter::Unread));
        assert!(visible_with(&inquiry, ThreadSide::Dealer, InquiryFilter::Unread));

        inquiry.dealer_read_at = Some(at());
        assert!(!visible_with(&inquiry, ThreadSide::Dealer, InquiryFilter::Unread));
        // The buyer's unread view only cares about the buyer's timestamp.
        assert!(visible_with(&inquiry, ThreadSide::Buyer, InquiryFilter::Unread));

        inquiry.user_archived = true;
        assert!(!visible_with(&inquiry, ThreadSide::Buyer, InquiryFilter::Unread));
    }

    #[test]
    fn counter_moves_only_on_first_contact() {
        let first = message_effect(None);
        assert!(!first.merge);
        assert!(first.increment_counter);
        assert_eq!(first.next_status, InquiryStatus::New);

        let open = thread();
        let followup = message_effect(Some(&open));
        assert!(followup.merge);
        assert!(!followup.increment_counter);
        assert_eq!(followup.next_status, InquiryStatus::New);
    }

    #[test]
    fn dealer_archived_thread_still_merges_buyer_messages() {
        // The dealer-side archive flag hides the thread from the dealer's
        // list but the row stays the open thread for the tuple.
        let mut open = thread();
        open.dealer_archived = true;

        let effect = message_effect(Some(&open));
        assert!(effect.merge);
        assert!(!effect.increment_counter);
    }

    #[test]
    fn status_cycles_new_read_replied_new() {
        assert_eq!(dealer_action(InquiryStatus::Read), DealerAction::Transition(InquiryStatus::Read));
        assert_eq!(
            dealer_action(InquiryStatus::Replied),
            DealerAction::Transition(InquiryStatus::Replied)
        );
        // A later buyer message resets the chain to NEW.
        assert_eq!(message_effect(Some(&thread())).next_status, InquiryStatus::New);
        // ARCHIVED is not part of the chain; it only flips the side flag.
        assert_eq!(dealer_action(InquiryStatus::Archived), DealerAction::ArchiveOnly);
    }
}

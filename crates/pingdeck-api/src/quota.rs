use pingdeck_types::plan::PlanTier;

/// Pure allow/deny check of (plan tier, current count).
///
/// Advisory-strict: the counter is read before the event is accepted and only
/// the post-delivery increment changes it, so concurrent requests near the
/// boundary can over-admit by a bounded amount.
pub fn quota_exceeded(plan: PlanTier, current_count: i64) -> bool {
    current_count >= i64::from(plan.quota().max_events_per_month)
}

//! Server-side Lua scripts for the Redis hot-state store.
//!
//! Redis executes scripts single-threaded, so each script below is one serialisation point: nothing interleaves
//! between the reads and writes inside a script. That property carries the whole no-oversell guarantee.

/// Check-and-decrement plus record write plus expiry-index insert, as one unit.
///
/// KEYS: counter, reservation record, expiry index.
/// ARGV: quantity, reservation id, record payload (JSON), expiry score (epoch seconds).
/// Returns `{1, remaining}` on success, `{0, available}` when stock is short, `{-1, 0}` when the counter is absent.
pub const RESERVE_SCRIPT: &str = r#"
local counter = KEYS[1]
local record = KEYS[2]
local index = KEYS[3]
local quantity = tonumber(ARGV[1])
local reservation_id = ARGV[2]
local payload = ARGV[3]
local score = tonumber(ARGV[4])

local available = redis.call('GET', counter)
if not available then
    return {-1, 0}
end
available = tonumber(available)
if available < quantity then
    return {0, available}
end
redis.call('DECRBY', counter, quantity)
redis.call('SET', record, payload)
redis.call('ZADD', index, score, reservation_id)
return {1, available - quantity}
"#;

/// Compare-and-delete with stock restoration (cancel/expire path).
///
/// KEYS: reservation record, expiry index.
/// ARGV: counter key prefix, reservation id, expected owner ('' skips the ownership check).
/// Returns `{1, payload}` when the record was deleted and its units restored, `{-1, ''}` on an ownership mismatch
/// (nothing changed), `{0, ''}` when the record was already gone (any stale index entry is dropped).
pub const RELEASE_SCRIPT: &str = r#"
local record = KEYS[1]
local index = KEYS[2]
local counter_prefix = ARGV[1]
local reservation_id = ARGV[2]
local owner = ARGV[3]

local payload = redis.call('GET', record)
if not payload then
    redis.call('ZREM', index, reservation_id)
    return {0, ''}
end
local data = cjson.decode(payload)
if owner ~= '' and data.user_id ~= owner then
    return {-1, ''}
end
redis.call('INCRBY', counter_prefix .. data.sku, data.quantity)
redis.call('DEL', record)
redis.call('ZREM', index, reservation_id)
return {1, payload}
"#;

/// Compare-and-delete WITHOUT stock restoration (confirm path: the units are sold, not released).
///
/// KEYS and ARGV as for [`RELEASE_SCRIPT`], minus the counter prefix.
pub const CONSUME_SCRIPT: &str = r#"
local record = KEYS[1]
local index = KEYS[2]
local reservation_id = ARGV[1]
local owner = ARGV[2]

local payload = redis.call('GET', record)
if not payload then
    return {0, ''}
end
local data = cjson.decode(payload)
if owner ~= '' and data.user_id ~= owner then
    return {-1, ''}
end
redis.call('DEL', record)
redis.call('ZREM', index, reservation_id)
return {1, payload}
"#;

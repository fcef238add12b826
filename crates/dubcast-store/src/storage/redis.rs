use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use dubcast_core::VideoKey;
use redis::{AsyncCommands, Script, aio::MultiplexedConnection};

use crate::model::{Segment, SegmentCompletion, SegmentId, SegmentState, Video, VideoId, lease_millis, now_millis};
use crate::{Result, SegmentStore, StoreError};

// KEYS: key index, video hash, segment list
// ARGV: video id, video key, created at, prefix, first segment id, chunk texts...
const CREATE_VIDEO_LUA: &str = r"
if redis.call('SETNX', KEYS[1], ARGV[1]) == 0 then
  return tonumber(redis.call('GET', KEYS[1]))
end
local n = #ARGV - 5
local first = tonumber(ARGV[5])
for i = 0, n - 1 do
  local id = first + i
  redis.call('HSET', ARGV[4] .. ':segment:' .. id,
    'id', id, 'video_id', ARGV[1], 'ordinal', i, 'transcript', ARGV[6 + i],
    'state', 'unprocessed', 'start_time', '0', 'end_time', '0', 'attempts', '0')
  redis.call('RPUSH', KEYS[3], id)
end
redis.call('HSET', KEYS[2], 'id', ARGV[1], 'key', ARGV[2], 'total_segments', n,
  'completed_segments', '0', 'created_at_ms', ARGV[3])
return tonumber(ARGV[1])
";

// KEYS: segment hash
// ARGV: now (ms), lease (ms)
const CLAIM_LUA: &str = r"
local state = redis.call('HGET', KEYS[1], 'state')
if state == 'processing' then
  local claimed = tonumber(redis.call('HGET', KEYS[1], 'claimed_at_ms') or '0')
  if tonumber(ARGV[1]) - claimed < tonumber(ARGV[2]) then
    return 0
  end
elseif state ~= 'unprocessed' then
  return 0
end
redis.call('HSET', KEYS[1], 'state', 'processing', 'claimed_at_ms', ARGV[1])
redis.call('HINCRBY', KEYS[1], 'attempts', 1)
return 1
";

// KEYS: segment hash
// ARGV: expected state, space-separated fields to clear, field/value pairs...
const TRANSITION_LUA: &str = r"
if redis.call('HGET', KEYS[1], 'state') ~= ARGV[1] then
  return 0
end
for field in string.gmatch(ARGV[2], '%S+') do
  redis.call('HDEL', KEYS[1], field)
end
redis.call('HSET', KEYS[1], unpack(ARGV, 3))
return 1
";

static CREATE_VIDEO: LazyLock<Script> = LazyLock::new(|| Script::new(CREATE_VIDEO_LUA));
static CLAIM: LazyLock<Script> = LazyLock::new(|| Script::new(CLAIM_LUA));
static TRANSITION: LazyLock<Script> = LazyLock::new(|| Script::new(TRANSITION_LUA));

/// Redis-backed store shared by every instance of the service
///
/// Videos and segments are hashes; each video keeps its segment ids in a
/// list in ordinal order. Conditional transitions run as Lua scripts so the
/// state check and the write cannot interleave with another instance.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    /// Create a store; no connection is made until first use
    pub fn new(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Backend(format!("invalid URL: {e}")))?;

        Ok(Self {
            client,
            prefix: prefix.trim_end_matches(':').to_owned(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Backend(format!("connection failed: {e}")))
    }

    fn key_index(&self, key: &VideoKey) -> String {
        format!("{}:video:key:{key}", self.prefix)
    }

    fn video_key(&self, id: VideoId) -> String {
        format!("{}:video:{id}", self.prefix)
    }

    fn segment_list(&self, id: VideoId) -> String {
        format!("{}:video:{id}:segments", self.prefix)
    }

    fn segment_key(&self, id: SegmentId) -> String {
        format!("{}:segment:{id}", self.prefix)
    }

    async fn transition(&self, id: SegmentId, expected: SegmentState, clear: &str, set: &[(&str, String)]) -> Result<bool> {
        let mut conn = self.connection().await?;

        let mut invocation = TRANSITION.key(self.segment_key(id));
        invocation.arg(expected.as_str()).arg(clear);
        for (field, value) in set {
            invocation.arg(*field).arg(value);
        }

        let applied: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("transition script failed: {e}")))?;

        Ok(applied == 1)
    }
}

#[async_trait]
impl SegmentStore for RedisStore {
    async fn find_video(&self, key: &VideoKey) -> Result<Option<Video>> {
        let mut conn = self.connection().await?;

        let id: Option<u64> = conn
            .get(self.key_index(key))
            .await
            .map_err(|e| StoreError::Backend(format!("GET failed: {e}")))?;

        match id {
            Some(id) => self.video(VideoId(id)).await,
            None => Ok(None),
        }
    }

    async fn create_video(&self, key: &VideoKey, chunks: &[String]) -> Result<Video> {
        if let Some(video) = self.find_video(key).await? {
            return Ok(video);
        }

        let mut conn = self.connection().await?;

        // Ids reserved here are simply skipped if another instance wins the race
        let video_id: u64 = conn
            .incr(format!("{}:video:seq", self.prefix), 1)
            .await
            .map_err(|e| StoreError::Backend(format!("INCR failed: {e}")))?;
        let count = u64::try_from(chunks.len()).unwrap_or(u64::MAX);
        let last_segment: u64 = conn
            .incr(format!("{}:segment:seq", self.prefix), count)
            .await
            .map_err(|e| StoreError::Backend(format!("INCRBY failed: {e}")))?;
        let first_segment = last_segment + 1 - count;

        let video_id = VideoId(video_id);
        let mut invocation = CREATE_VIDEO.key(self.key_index(key));
        invocation
            .key(self.video_key(video_id))
            .key(self.segment_list(video_id))
            .arg(video_id.0)
            .arg(key.as_str())
            .arg(now_millis())
            .arg(&self.prefix)
            .arg(first_segment);
        for chunk in chunks {
            invocation.arg(chunk);
        }

        let stored: u64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("create script failed: {e}")))?;

        if stored != video_id.0 {
            tracing::debug!(video_key = %key, existing = stored, "video created concurrently");
        }

        self.video(VideoId(stored)).await?.ok_or_else(|| StoreError::Corrupt {
            key: self.key_index(key),
            reason: format!("points at missing video {stored}"),
        })
    }

    async fn video(&self, id: VideoId) -> Result<Option<Video>> {
        let mut conn = self.connection().await?;
        let key = self.video_key(id);

        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| StoreError::Backend(format!("HGETALL failed: {e}")))?;

        if fields.is_empty() {
            return Ok(None);
        }
        decode_video(&key, &fields).map(Some)
    }

    async fn segments(&self, video: VideoId) -> Result<Vec<Segment>> {
        let mut conn = self.connection().await?;

        let ids: Vec<u64> = conn
            .lrange(self.segment_list(video), 0, -1)
            .await
            .map_err(|e| StoreError::Backend(format!("LRANGE failed: {e}")))?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.into_iter().map(|id| self.segment_key(SegmentId(id))).collect();
        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.hgetall(key);
        }

        let rows: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("pipeline failed: {e}")))?;

        keys.iter()
            .zip(rows)
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(key, fields)| decode_segment(key, &fields))
            .collect()
    }

    async fn segment(&self, id: SegmentId) -> Result<Option<Segment>> {
        let mut conn = self.connection().await?;
        let key = self.segment_key(id);

        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| StoreError::Backend(format!("HGETALL failed: {e}")))?;

        if fields.is_empty() {
            return Ok(None);
        }
        decode_segment(&key, &fields).map(Some)
    }

    async fn count(&self, video: VideoId) -> Result<usize> {
        let mut conn = self.connection().await?;

        conn.llen(self.segment_list(video))
            .await
            .map_err(|e| StoreError::Backend(format!("LLEN failed: {e}")))
    }

    async fn claim(&self, id: SegmentId, lease: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;

        let claimed: i64 = CLAIM
            .key(self.segment_key(id))
            .arg(now_millis())
            .arg(lease_millis(lease))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(format!("claim script failed: {e}")))?;

        Ok(claimed == 1)
    }

    async fn complete(&self, id: SegmentId, completion: &SegmentCompletion) -> Result<bool> {
        self.transition(
            id,
            SegmentState::Processing,
            "claimed_at_ms last_error",
            &[
                ("state", SegmentState::Processed.as_str().to_owned()),
                ("audio_url", completion.audio_url.clone()),
                ("start_time", completion.start_time.to_string()),
                ("end_time", completion.end_time.to_string()),
            ],
        )
        .await
    }

    async fn fail(&self, id: SegmentId, message: &str) -> Result<bool> {
        self.transition(
            id,
            SegmentState::Processing,
            "claimed_at_ms",
            &[
                ("state", SegmentState::Failed.as_str().to_owned()),
                ("last_error", message.to_owned()),
            ],
        )
        .await
    }

    async fn release(&self, id: SegmentId) -> Result<bool> {
        self.transition(
            id,
            SegmentState::Processing,
            "claimed_at_ms",
            &[("state", SegmentState::Unprocessed.as_str().to_owned())],
        )
        .await
    }

    async fn requeue(&self, id: SegmentId) -> Result<bool> {
        self.transition(
            id,
            SegmentState::Failed,
            "",
            &[("state", SegmentState::Unprocessed.as_str().to_owned())],
        )
        .await
    }

    async fn mark_complete(&self, video: VideoId, total: usize) -> Result<()> {
        let mut conn = self.connection().await?;

        let _: () = conn
            .hset(self.video_key(video), "completed_segments", total)
            .await
            .map_err(|e| StoreError::Backend(format!("HSET failed: {e}")))?;

        Ok(())
    }
}

fn field<T: FromStr>(key: &str, fields: &HashMap<String, String>, name: &str) -> Result<T> {
    let raw = fields.get(name).ok_or_else(|| StoreError::Corrupt {
        key: key.to_owned(),
        reason: format!("missing field `{name}`"),
    })?;

    raw.parse().map_err(|_| StoreError::Corrupt {
        key: key.to_owned(),
        reason: format!("invalid value for `{name}`: {raw}"),
    })
}

fn optional_field<T: FromStr>(key: &str, fields: &HashMap<String, String>, name: &str) -> Result<Option<T>> {
    match fields.get(name) {
        Some(raw) if !raw.is_empty() => field(key, fields, name).map(Some),
        _ => Ok(None),
    }
}

fn decode_video(key: &str, fields: &HashMap<String, String>) -> Result<Video> {
    let raw_key: String = field(key, fields, "key")?;
    let video_key = VideoKey::parse(&raw_key).map_err(|e| StoreError::Corrupt {
        key: key.to_owned(),
        reason: e.to_string(),
    })?;

    Ok(Video {
        id: VideoId(field(key, fields, "id")?),
        key: video_key,
        total_segments: field(key, fields, "total_segments")?,
        completed_segments: field(key, fields, "completed_segments")?,
        created_at_ms: field(key, fields, "created_at_ms")?,
    })
}

fn decode_segment(key: &str, fields: &HashMap<String, String>) -> Result<Segment> {
    let raw_state: String = field(key, fields, "state")?;
    let state = SegmentState::parse(&raw_state).ok_or_else(|| StoreError::Corrupt {
        key: key.to_owned(),
        reason: format!("unknown state `{raw_state}`"),
    })?;

    Ok(Segment {
        id: SegmentId(field(key, fields, "id")?),
        video_id: VideoId(field(key, fields, "video_id")?),
        ordinal: field(key, fields, "ordinal")?,
        transcript: field(key, fields, "transcript")?,
        state,
        start_time: field(key, fields, "start_time")?,
        end_time: field(key, fields, "end_time")?,
        audio_url: optional_field(key, fields, "audio_url")?,
        attempts: field(key, fields, "attempts")?,
        last_error: optional_field(key, fields, "last_error")?,
        claimed_at_ms: optional_field(key, fields, "claimed_at_ms")?,
    })
}

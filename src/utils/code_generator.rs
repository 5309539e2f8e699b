use crate::error::AppResult;
use crate::store::LoyaltyStore;
use rand::Rng;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 生成指定长度的大写字母数字串
pub fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// 生成唯一奖励码：`{prefix}{8位字母数字}`，冲突时重试
pub async fn generate_unique_reward_code(
    store: &dyn LoyaltyStore,
    prefix: &str,
) -> AppResult<String> {
    loop {
        let code = format!("{prefix}{}", random_code(8));
        if !store.reward_code_exists(&code).await? {
            return Ok(code);
        }
    }
}

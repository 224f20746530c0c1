// CRC-32/ISO-HDLC, the variant Matroska stores in its CRC-32 elements.
// Reflected polynomial 0xEDB88320, init and final XOR of all ones.

const CRC_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
	let mut table = [0u32; 256];
	let mut i = 0;
	while i < 256 {
		let mut crc = i as u32;
		let mut bit = 0;
		while bit < 8 {
			if crc & 1 != 0 {
				crc = (crc >> 1) ^ 0xEDB8_8320;
			} else {
				crc >>= 1;
			}
			bit += 1;
		}
		table[i] = crc;
		i += 1;
	}
	table
}

pub(crate) fn crc32(data: &[u8]) -> u32 {
	let mut crc = u32::MAX;
	for byte in data {
		crc = (crc >> 8) ^ CRC_TABLE[((crc ^ u32::from(*byte)) & 0xFF) as usize];
	}
	crc ^ u32::MAX
}
